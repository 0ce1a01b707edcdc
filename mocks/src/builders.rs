//! Builder pattern implementations for easy test data construction
//!
//! Provides fluent builders for users and tasks with sensible defaults.

use chrono::{DateTime, Utc};
use todo_core::{models::timestamp_now, NewTask, Task, User};

/// Builder for constructing User instances in tests
pub struct UserBuilder {
    user: User,
}

impl Default for UserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UserBuilder {
    /// Create new builder with default values
    pub fn new() -> Self {
        let now = timestamp_now();
        Self {
            user: User {
                id: 1,
                name: "Ann".to_string(),
                email: "ann@x.com".to_string(),
                password_hash: "$argon2id$v=19$m=64,t=1,p=1$placeholder".to_string(),
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.user.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.user.name = name.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.user.email = email.into();
        self
    }

    /// Set the stored digest, e.g. one produced by a real hasher
    pub fn with_password_hash(mut self, digest: impl Into<String>) -> Self {
        self.user.password_hash = digest.into();
        self
    }

    pub fn build(self) -> User {
        self.user
    }
}

/// Builder for constructing Task instances in tests
pub struct TaskBuilder {
    task: Task,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBuilder {
    /// Create new builder with default values
    pub fn new() -> Self {
        let now = timestamp_now();
        Self {
            task: Task {
                id: 1,
                user_id: 1,
                title: "Test Task".to_string(),
                completed: false,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.task.id = id;
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.task.user_id = user_id;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.task.title = title.into();
        self
    }

    pub fn completed(mut self) -> Self {
        self.task.completed = true;
        self
    }

    /// Set both timestamps
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.task.created_at = at;
        self.task.updated_at = at;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }

    /// Build just the insert payload
    pub fn build_new(self) -> NewTask {
        NewTask::new(self.task.user_id, self.task.title)
    }
}
