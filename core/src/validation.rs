use crate::error::{Result, TodoError};

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Validation utilities for request input
pub struct InputValidator;

impl InputValidator {
    /// Trim a required string field
    ///
    /// # Returns
    /// * `Ok(String)` - The trimmed value
    /// * `Err(TodoError::Validation)` - If the field is missing or blank
    pub fn required(field: &str, value: Option<&str>) -> Result<String> {
        match value.map(str::trim) {
            Some(trimmed) if !trimmed.is_empty() => Ok(trimmed.to_string()),
            _ => Err(TodoError::empty_field(field)),
        }
    }

    /// Normalize an email for storage and lookup
    ///
    /// Emails compare case-insensitively, so they are trimmed and lowercased.
    pub fn normalize_email(value: Option<&str>) -> Result<String> {
        Self::required("email", value).map(|email| email.to_lowercase())
    }

    /// Validate a password for registration
    ///
    /// The password is not trimmed; surrounding whitespace is significant.
    pub fn validate_new_password(value: Option<&str>) -> Result<String> {
        let password = match value {
            Some(p) if !p.is_empty() => p,
            _ => return Err(TodoError::empty_field("password")),
        };

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(TodoError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }

        Ok(password.to_string())
    }

    /// Require a present password for login without length rules
    pub fn login_password(value: Option<&str>) -> Result<String> {
        match value {
            Some(p) if !p.is_empty() => Ok(p.to_string()),
            _ => Err(TodoError::empty_field("password")),
        }
    }

    /// Validate an optional replacement title
    ///
    /// `None` means "keep the stored title"; a present title must not be
    /// blank after trimming.
    pub fn optional_title(value: Option<&str>) -> Result<Option<String>> {
        match value {
            None => Ok(None),
            Some(title) => {
                let trimmed = title.trim();
                if trimmed.is_empty() {
                    Err(TodoError::Validation("Title cannot be empty".to_string()))
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(InputValidator::required("name", Some("  Ann ")).unwrap(), "Ann");
        assert!(InputValidator::required("name", Some("   ")).is_err());
        assert!(InputValidator::required("name", None).is_err());
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(
            InputValidator::normalize_email(Some(" Ann@X.com ")).unwrap(),
            "ann@x.com"
        );
        assert!(InputValidator::normalize_email(Some("")).unwrap_err().is_validation());
    }

    #[test]
    fn test_password_length() {
        assert!(InputValidator::validate_new_password(Some("secret1")).is_ok());
        assert!(InputValidator::validate_new_password(Some("123456")).is_ok());

        let err = InputValidator::validate_new_password(Some("12345")).unwrap_err();
        assert_eq!(
            err,
            TodoError::Validation("Password must be at least 6 characters long".to_string())
        );
        assert!(InputValidator::validate_new_password(None).is_err());
    }

    #[test]
    fn test_password_counts_characters_not_bytes() {
        // Five characters, ten bytes
        assert!(InputValidator::validate_new_password(Some("ééééé")).is_err());
        assert!(InputValidator::validate_new_password(Some("éééééé")).is_ok());
    }

    #[test]
    fn test_optional_title() {
        assert_eq!(InputValidator::optional_title(None).unwrap(), None);
        assert_eq!(
            InputValidator::optional_title(Some(" Write spec ")).unwrap(),
            Some("Write spec".to_string())
        );
        assert!(InputValidator::optional_title(Some("  ")).is_err());
    }

    #[test]
    fn test_login_password() {
        assert_eq!(InputValidator::login_password(Some(" x ")).unwrap(), " x ");
        assert!(InputValidator::login_password(Some("")).is_err());
    }
}
