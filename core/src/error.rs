use thiserror::Error;

/// Result type alias for task manager operations
pub type Result<T> = std::result::Result<T, TodoError>;

/// Error taxonomy shared by the store, the hasher and the request handlers.
///
/// Each variant maps onto exactly one HTTP status code. Variants carrying
/// internal detail (`Database`, `Hashing`, `Configuration`, `Internal`) are
/// logged by the HTTP layer but never echoed back to clients.
///
/// # Examples
///
/// ```rust
/// use todo_core::error::TodoError;
///
/// let missing = TodoError::user_not_found(7);
/// assert!(missing.is_not_found());
/// assert_eq!(missing.status_code(), 404);
///
/// let dup = TodoError::DuplicateKey("users.email".to_string());
/// assert!(dup.is_conflict());
/// assert_eq!(dup.status_code(), 409);
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// Missing, empty, too short or mistyped input field
    #[error("{0}")]
    Validation(String),

    /// Referenced user or task does not exist (or is not owned by the user)
    #[error("{0}")]
    NotFound(String),

    /// Friendly duplicate detected by a handler pre-check
    #[error("{0}")]
    Conflict(String),

    /// Unique constraint violated at the store level
    #[error("Duplicate value for unique key: {0}")]
    DuplicateKey(String),

    /// Credential mismatch, deliberately identical for unknown email
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Backend unreachable, malformed statement or undecodable row
    #[error("Database error: {0}")]
    Database(String),

    /// Password hashing or digest parsing failure
    #[error("Hashing error: {0}")]
    Hashing(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal system error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TodoError {
    /// Create a not found error for a user ID
    pub fn user_not_found(id: i64) -> Self {
        Self::NotFound(format!("User with ID {id} not found"))
    }

    /// Create a not found error for a task ID
    pub fn task_not_found(id: i64) -> Self {
        Self::NotFound(format!("Task with ID {id} not found"))
    }

    /// Create a validation error for an empty field
    pub fn empty_field(field: &str) -> Self {
        Self::Validation(format!("Field '{field}' is required"))
    }

    /// Create a conflict error for an email that is already registered
    pub fn email_taken() -> Self {
        Self::Conflict("Email is already registered".to_string())
    }

    /// Check if this error indicates a not found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, TodoError::NotFound(_))
    }

    /// Check if this error indicates a validation problem
    pub fn is_validation(&self) -> bool {
        matches!(self, TodoError::Validation(_))
    }

    /// Check if this error indicates a duplicate unique value
    pub fn is_conflict(&self) -> bool {
        matches!(self, TodoError::Conflict(_) | TodoError::DuplicateKey(_))
    }

    /// Check if this error indicates a database problem
    pub fn is_database(&self) -> bool {
        matches!(self, TodoError::Database(_))
    }

    /// Whether the message is safe to show to an API client
    pub fn is_client_facing(&self) -> bool {
        self.status_code() < 500
    }

    /// Convert to the HTTP status code equivalent
    pub fn status_code(&self) -> u16 {
        match self {
            TodoError::Validation(_) => 400,
            TodoError::InvalidCredentials => 401,
            TodoError::NotFound(_) => 404,
            TodoError::Conflict(_) | TodoError::DuplicateKey(_) => 409,
            TodoError::Database(_)
            | TodoError::Hashing(_)
            | TodoError::Configuration(_)
            | TodoError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = TodoError::user_not_found(42);
        assert_eq!(error, TodoError::NotFound("User with ID 42 not found".to_string()));
        assert!(error.is_not_found());
        assert_eq!(error.status_code(), 404);

        let error = TodoError::task_not_found(3);
        assert_eq!(error.to_string(), "Task with ID 3 not found");

        let error = TodoError::empty_field("title");
        assert!(error.is_validation());
        assert_eq!(error.status_code(), 400);
        assert_eq!(error.to_string(), "Field 'title' is required");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(TodoError::InvalidCredentials.status_code(), 401);
        assert_eq!(TodoError::email_taken().status_code(), 409);
        assert_eq!(TodoError::DuplicateKey("users.email".into()).status_code(), 409);
        assert_eq!(TodoError::Database("down".into()).status_code(), 500);
        assert_eq!(TodoError::Hashing("bad".into()).status_code(), 500);
        assert_eq!(TodoError::Configuration("bad".into()).status_code(), 500);
        assert_eq!(TodoError::Internal("bad".into()).status_code(), 500);
    }

    #[test]
    fn test_error_predicates() {
        assert!(TodoError::email_taken().is_conflict());
        assert!(TodoError::DuplicateKey("x".into()).is_conflict());
        assert!(!TodoError::Validation("x".into()).is_conflict());

        assert!(TodoError::Database("x".into()).is_database());
        assert!(!TodoError::Database("x".into()).is_client_facing());
        assert!(TodoError::InvalidCredentials.is_client_facing());
    }
}
