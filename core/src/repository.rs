use async_trait::async_trait;
use crate::{
    error::Result,
    models::{NewTask, NewUser, StoreStats, Task, UpdateTask, User},
};

/// Repository trait for user persistence and lookup
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user
    ///
    /// # Arguments
    /// * `user` - Name, lowercased email and password digest
    ///
    /// # Returns
    /// * `Ok(User)` - The stored user with assigned ID and timestamps
    /// * `Err(TodoError::DuplicateKey)` - If the email is already taken
    /// * `Err(TodoError::Database)` - If the database operation fails
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Get a user by numeric ID
    ///
    /// # Returns
    /// * `Ok(Some(User))` - The user if found
    /// * `Ok(None)` - If no user exists with that ID
    /// * `Err(TodoError::Database)` - If the database operation fails
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get a user by email; callers pass the normalized (lowercased) form
    ///
    /// # Returns
    /// * `Ok(Some(User))` - The user if found
    /// * `Ok(None)` - If no user has that email
    /// * `Err(TodoError::Database)` - If the database operation fails
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Repository trait for task persistence, always scoped to an owner
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Create a new, incomplete task
    ///
    /// # Returns
    /// * `Ok(Task)` - The created task with assigned ID and timestamps
    /// * `Err(TodoError::Database)` - If the database operation fails
    async fn create_task(&self, task: NewTask) -> Result<Task>;

    /// List all tasks of a user, newest first
    async fn list_tasks(&self, user_id: i64) -> Result<Vec<Task>>;

    /// Get a task only if it belongs to the given user
    ///
    /// # Returns
    /// * `Ok(Some(Task))` - The task if it exists and is owned by `user_id`
    /// * `Ok(None)` - If the task is missing or owned by someone else
    async fn get_task(&self, user_id: i64, task_id: i64) -> Result<Option<Task>>;

    /// Apply a partial update to an owned task, refreshing `updated_at`
    ///
    /// # Returns
    /// * `Ok(Some(Task))` - The updated task
    /// * `Ok(None)` - If the task is missing or owned by someone else
    /// * `Err(TodoError::Database)` - If the database operation fails
    async fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        updates: UpdateTask,
    ) -> Result<Option<Task>>;

    /// Delete an owned task
    ///
    /// # Returns
    /// * `Ok(true)` - A row was deleted
    /// * `Ok(false)` - The task is missing or owned by someone else
    async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<bool>;
}

/// Store-wide operations used for health reporting and bootstrap logging
#[async_trait]
pub trait StoreHealth: Send + Sync {
    /// Check that the backend answers a trivial query
    async fn health_check(&self) -> Result<()>;

    /// Row counts across the store
    async fn stats(&self) -> Result<StoreStats>;
}

/// Everything the request handlers need from a store
pub trait TodoRepository: UserRepository + TaskRepository + StoreHealth {}

impl<T: UserRepository + TaskRepository + StoreHealth> TodoRepository for T {}
