//! Error handling for the HTTP API
//!
//! Maps domain errors to status codes and the `{message}` response body.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use todo_core::TodoError;

/// Body message for every 500 response
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// HTTP API errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Carries detail for the log only
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Convert to the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Convert from TodoError to ApiError
impl From<TodoError> for ApiError {
    fn from(err: TodoError) -> Self {
        match err {
            TodoError::Validation(msg) => ApiError::Validation(msg),
            TodoError::NotFound(msg) => ApiError::NotFound(msg),
            TodoError::Conflict(msg) => ApiError::Conflict(msg),
            TodoError::DuplicateKey(_) => ApiError::Conflict("Resource already exists".to_string()),
            TodoError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            TodoError::Database(_)
            | TodoError::Hashing(_)
            | TodoError::Configuration(_)
            | TodoError::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Request failed");
        }
        (status, Json(json!({ "message": self.public_message() }))).into_response()
    }
}

/// Give router-generated 405 and 413 responses the `{message}` body
///
/// Responses that already carry JSON are left alone. The `Allow` header of a
/// 405 is kept.
pub async fn json_error_responses(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return response;
    }

    match response.status() {
        StatusCode::METHOD_NOT_ALLOWED => {
            let allow: Option<HeaderValue> = response.headers().get(header::ALLOW).cloned();
            let mut rewritten =
                ApiError::MethodNotAllowed("Method not allowed".to_string()).into_response();
            if let Some(allow) = allow {
                rewritten.headers_mut().insert(header::ALLOW, allow);
            }
            rewritten
        }
        StatusCode::PAYLOAD_TOO_LARGE => {
            ApiError::PayloadTooLarge("Request body too large".to_string()).into_response()
        }
        _ => response,
    }
}
