//! Task manager request handler
//!
//! Endpoint logic independent of the HTTP framework: validation, ordering
//! of store calls and error mapping. The router in [`crate::server`] only
//! extracts raw inputs and renders the results.

use crate::error::ApiError;
use crate::serialization::{bool_field, string_field};
use serde_json::{Map, Value};
use std::sync::Arc;
use todo_core::{
    CredentialHasher, InputValidator, NewTask, NewUser, PublicUser, Task, TodoError,
    TodoRepository, UpdateTask,
};

type Body = Map<String, Value>;

/// Parse a path id; anything but a positive integer names no entity
fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

/// Handler that bridges the HTTP routes with the repository and hasher
#[derive(Clone)]
pub struct TodoHandler<R> {
    repository: Arc<R>,
    hasher: CredentialHasher,
}

impl<R> TodoHandler<R> {
    pub fn new(repository: Arc<R>, hasher: CredentialHasher) -> Self {
        Self { repository, hasher }
    }

    /// Get a clone of the repository Arc
    pub fn repository(&self) -> Arc<R> {
        self.repository.clone()
    }
}

impl<R: TodoRepository> TodoHandler<R> {
    /// Register a new account
    ///
    /// # Returns
    /// * `Ok(PublicUser)` - The stored user without its digest
    /// * `Err(ApiError::Validation)` - Missing field or short password
    /// * `Err(ApiError::Conflict)` - Email already registered
    pub async fn register(&self, body: &Body) -> Result<PublicUser, ApiError> {
        let name = InputValidator::required("name", string_field(body, "name")?)?;
        let email = InputValidator::normalize_email(string_field(body, "email")?)?;
        let password = InputValidator::validate_new_password(string_field(body, "password")?)?;

        if self.repository.get_user_by_email(&email).await?.is_some() {
            return Err(TodoError::email_taken().into());
        }

        let password_hash = self.hash_password(password).await?;

        // The unique constraint decides races the pre-check cannot see
        let user = self
            .repository
            .create_user(NewUser {
                name,
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                TodoError::DuplicateKey(_) => TodoError::email_taken(),
                other => other,
            })?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user.to_public())
    }

    /// Check credentials
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, body: &Body) -> Result<PublicUser, ApiError> {
        let email = InputValidator::normalize_email(string_field(body, "email")?)?;
        let password = InputValidator::login_password(string_field(body, "password")?)?;

        let Some(user) = self.repository.get_user_by_email(&email).await? else {
            return Err(TodoError::InvalidCredentials.into());
        };

        if !self.verify_password(password, user.password_hash.clone()).await? {
            return Err(TodoError::InvalidCredentials.into());
        }

        Ok(user.to_public())
    }

    /// List a user's tasks, newest first
    pub async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, ApiError> {
        let user_id = self.resolve_user(user_id).await?;
        Ok(self.repository.list_tasks(user_id).await?)
    }

    /// Create an incomplete task
    pub async fn create_task(&self, user_id: &str, body: &Body) -> Result<Task, ApiError> {
        let title = InputValidator::required("title", string_field(body, "title")?)?;
        let user_id = self.resolve_user(user_id).await?;

        let task = self.repository.create_task(NewTask::new(user_id, title)).await?;
        tracing::debug!(task_id = task.id, user_id, "Task created");
        Ok(task)
    }

    /// Apply a partial update to an owned task
    pub async fn update_task(
        &self,
        user_id: &str,
        task_id: &str,
        body: &Body,
    ) -> Result<Task, ApiError> {
        let updates = UpdateTask {
            title: InputValidator::optional_title(string_field(body, "title")?)?,
            completed: bool_field(body, "completed")?,
        };
        let user_id = self.resolve_user(user_id).await?;
        let task_id = Self::task_id(task_id)?;

        self.repository
            .update_task(user_id, task_id, updates)
            .await?
            .ok_or_else(|| TodoError::task_not_found(task_id).into())
    }

    /// Delete an owned task
    pub async fn delete_task(&self, user_id: &str, task_id: &str) -> Result<(), ApiError> {
        let user_id = self.resolve_user(user_id).await?;
        let task_id = Self::task_id(task_id)?;

        if self.repository.delete_task(user_id, task_id).await? {
            tracing::debug!(task_id, user_id, "Task deleted");
            Ok(())
        } else {
            Err(TodoError::task_not_found(task_id).into())
        }
    }

    /// Probe the store
    pub async fn health(&self) -> Result<(), ApiError> {
        Ok(self.repository.health_check().await?)
    }

    async fn resolve_user(&self, raw: &str) -> Result<i64, ApiError> {
        let not_found = || ApiError::NotFound(format!("User with ID {raw} not found"));
        let id = parse_id(raw).ok_or_else(not_found)?;

        match self.repository.get_user_by_id(id).await? {
            Some(user) => Ok(user.id),
            None => Err(not_found()),
        }
    }

    fn task_id(raw: &str) -> Result<i64, ApiError> {
        parse_id(raw).ok_or_else(|| ApiError::NotFound(format!("Task with ID {raw} not found")))
    }

    async fn hash_password(&self, password: String) -> Result<String, ApiError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ApiError::Internal(format!("Hashing task failed: {e}")))?
            .map_err(ApiError::from)
    }

    async fn verify_password(&self, password: String, digest: String) -> Result<bool, ApiError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| ApiError::Internal(format!("Verification task failed: {e}")))?
            .map_err(ApiError::from)
    }
}
