use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Account holder. Tasks are always scoped to exactly one user.
///
/// The password hash is carried for credential verification only and is
/// never part of any API payload; see [`PublicUser`].
///
/// # Examples
///
/// ```rust
/// use todo_core::models::User;
/// use chrono::Utc;
///
/// let user = User {
///     id: 1,
///     name: "Ann".to_string(),
///     email: "ann@x.com".to_string(),
///     password_hash: "$argon2id$v=19$...".to_string(),
///     created_at: Utc::now(),
///     updated_at: Utc::now(),
/// };
///
/// let public = user.to_public();
/// assert_eq!(public.email, "ann@x.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Backend-assigned primary key
    pub id: i64,
    /// Display name
    pub name: String,
    /// Lowercased email, unique across users
    pub email: String,
    /// PHC-formatted digest
    pub password_hash: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public subset safe to return to clients
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Identity returned by registration and login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Data transfer object for inserting a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// A to-do item owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Backend-assigned primary key
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Trimmed, non-empty title
    pub title: String,
    /// Completion flag, false on creation
    pub completed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Timestamp to store on the next update.
    ///
    /// Always strictly later than the current `updated_at`, even when the
    /// clock has not advanced past the storage precision.
    pub fn next_updated_at(&self) -> DateTime<Utc> {
        let now = timestamp_now();
        let floor = self.updated_at + Duration::microseconds(1);
        if now > self.updated_at {
            now
        } else {
            floor
        }
    }

    /// Check if the task belongs to the given user
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

/// Data transfer object for creating new tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub user_id: i64,
    pub title: String,
}

impl NewTask {
    pub fn new(user_id: i64, title: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
        }
    }
}

/// Partial update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Apply the update on top of an existing task
    pub fn apply_to(&self, task: &Task) -> Task {
        Task {
            title: self.title.clone().unwrap_or_else(|| task.title.clone()),
            completed: self.completed.unwrap_or(task.completed),
            updated_at: task.next_updated_at(),
            ..task.clone()
        }
    }
}

/// Row counts across the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub users: u64,
    pub tasks: u64,
    pub completed_tasks: u64,
}

/// Current time truncated to microseconds, the finest precision both
/// backends persist.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        let now = timestamp_now();
        Task {
            id: 1,
            user_id: 10,
            title: "Buy milk".to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_public_user_drops_hash() {
        let user = User {
            id: 3,
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            password_hash: "secret-digest".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let public = user.to_public();
        assert!(!format!("{public:?}").contains("secret-digest"));
        assert_eq!(public.id, 3);
        assert_eq!(public.name, "Ann");
    }

    #[test]
    fn test_next_updated_at_strictly_increases() {
        let mut task = sample_task();
        // A stored timestamp from the future forces the +1µs floor
        task.updated_at = timestamp_now() + Duration::seconds(60);
        let next = task.next_updated_at();
        assert!(next > task.updated_at);
        assert_eq!(next - task.updated_at, Duration::microseconds(1));

        let task = sample_task();
        assert!(task.next_updated_at() > task.updated_at);
    }

    #[test]
    fn test_update_apply_keeps_unspecified_fields() {
        let task = sample_task();
        let updated = UpdateTask::new().completed(true).apply_to(&task);
        assert_eq!(updated.title, "Buy milk");
        assert!(updated.completed);
        assert_eq!(updated.created_at, task.created_at);
        assert!(updated.updated_at > task.updated_at);

        let renamed = UpdateTask::new().title("Buy oat milk").apply_to(&task);
        assert_eq!(renamed.title, "Buy oat milk");
        assert!(!renamed.completed);
    }

    #[test]
    fn test_ownership() {
        let task = sample_task();
        assert!(task.is_owned_by(10));
        assert!(!task.is_owned_by(11));
    }

    #[test]
    fn test_timestamp_precision() {
        let now = timestamp_now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
    }
}
