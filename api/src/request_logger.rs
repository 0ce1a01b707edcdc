//! Structured request logging middleware for the API
//!
//! Emits one event per `/api` request with method, path, status, latency and
//! a truncated summary of the JSON body. Sensitive fields are redacted.

use crate::error::ApiError;
use axum::{
    body::Body,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;
use std::time::Instant;

/// Largest request body accepted on `/api`, in bytes
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Maximum length for field values before truncation
const MAX_FIELD_LENGTH: usize = 30;

/// Truncation suffix for long values
const TRUNCATION_SUFFIX: &str = "...";

/// Request logging middleware
pub async fn api_request_logging_middleware(request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let (parts, body) = request.into_parts();
    let body_bytes = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            tracing::warn!(%method, %path, limit = MAX_BODY_BYTES, "Request body too large");
            return ApiError::PayloadTooLarge("Request body too large".to_string())
                .into_response();
        }
        Err(e) => {
            tracing::warn!(%method, %path, error = %e, "Failed to read request body");
            return ApiError::Validation("Malformed request body".to_string()).into_response();
        }
    };

    let summary = if body_bytes.is_empty() {
        String::new()
    } else {
        match serde_json::from_slice::<Value>(&body_bytes) {
            Ok(json) => format_body_summary(&json),
            Err(_) => "invalid_json".to_string(),
        }
    };

    let response = next
        .run(Request::from_parts(parts, Body::from(body_bytes)))
        .await;

    let status = response.status().as_u16();
    let latency_ms = start_time.elapsed().as_millis() as u64;

    if status >= 500 {
        tracing::warn!(%method, %path, status, latency_ms, body = %summary, "Request failed");
    } else {
        tracing::info!(%method, %path, status, latency_ms, body = %summary, "Request handled");
    }

    response
}

/// Format a body into a summary string with truncation and redaction
fn format_body_summary(body: &Value) -> String {
    match body {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                if is_sensitive_field(key) {
                    format!("{key}=\"[REDACTED]\"")
                } else {
                    format!("{key}=\"{}\"", format_field_value(value))
                }
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        _ => format_field_value(body),
    }
}

fn format_field_value(value: &Value) -> String {
    let value_str = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{...{} fields}}", obj.len()),
        Value::Null => "null".to_string(),
    };

    truncate_string(&value_str, MAX_FIELD_LENGTH)
}

/// Truncate to at most `max_length` characters including the suffix
fn truncate_string(input: &str, max_length: usize) -> String {
    if input.chars().count() <= max_length {
        input.to_string()
    } else {
        let keep = max_length.saturating_sub(TRUNCATION_SUFFIX.len());
        let head: String = input.chars().take(keep).collect();
        format!("{head}{TRUNCATION_SUFFIX}")
    }
}

/// Check if a field should be redacted
fn is_sensitive_field(key: &str) -> bool {
    const SENSITIVE_KEYS: [&str; 8] = [
        "password",
        "passwd",
        "token",
        "secret",
        "authorization",
        "credential",
        "api_key",
        "hash",
    ];

    let key_lower = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|sensitive| key_lower.contains(sensitive))
}
