//! Todo Core Library
//!
//! This crate provides the domain models, error taxonomy, repository traits
//! and credential hashing for the task manager. The database, HTTP and server
//! crates all depend on the types and interfaces defined here.
//!
//! # Architecture
//!
//! - [`models`] - Users, tasks and their insert/update shapes
//! - [`error`] - Error types and result handling
//! - [`repository`] - Repository traits for data persistence
//! - [`validation`] - Request input validation
//! - [`password`] - Argon2id credential hasher
//!
//! # Example
//!
//! ```rust
//! use todo_core::{validation::InputValidator, CredentialHasher};
//!
//! let email = InputValidator::normalize_email(Some(" Ann@X.com ")).unwrap();
//! assert_eq!(email, "ann@x.com");
//!
//! let hasher = CredentialHasher::new(64, 1, 1).unwrap();
//! let digest = hasher.hash("secret1").unwrap();
//! assert!(hasher.verify("secret1", &digest).unwrap());
//! ```

pub mod error;
pub mod models;
pub mod password;
pub mod repository;
pub mod validation;

// Re-export commonly used types at the crate root for convenience
pub use error::{Result, TodoError};
pub use models::{NewTask, NewUser, PublicUser, StoreStats, Task, UpdateTask, User};
pub use password::CredentialHasher;
pub use repository::{StoreHealth, TaskRepository, TodoRepository, UserRepository};
pub use validation::{InputValidator, MIN_PASSWORD_LENGTH};

/// Current version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_crate_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(CRATE_NAME, "todo-core");
    }

    #[test]
    fn test_re_exports() {
        let error = TodoError::user_not_found(1);
        assert!(error.is_not_found());
        assert_eq!(MIN_PASSWORD_LENGTH, 6);
    }
}
