//! Error types for the CRM server.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based HTTP status mapping (400 validation, 401 auth,
//!   404 not-found, 500 everything else)
//! - The uniform JSON error envelope returned to clients
//!
//! Internal detail (database/IO/JSON errors) is logged at the HTTP
//! boundary and never echoed into a 500 response body.

use std::collections::BTreeMap;
use thiserror::Error;

/// Result type alias for CRM operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Not Found (404)
    NotFound,

    // Validation (400)
    ValidationFailed,

    // Auth (401)
    AuthenticationFailed,

    // Everything else (500)
    DatabaseError,
    ConfigError,
    IoError,
    JsonError,
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this category.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::ValidationFailed => 400,
            Self::AuthenticationFailed => 401,
            Self::DatabaseError
            | Self::ConfigError
            | Self::IoError
            | Self::JsonError
            | Self::InternalError => 500,
        }
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in CRM operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{entity} not found with id: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Validation failed")]
    Validation { fields: BTreeMap<String, String> },

    #[error("Invalid credentials")]
    Authentication,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a single-field validation failure.
    #[must_use]
    pub fn validation(field: &str, message: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), message.to_string());
        Self::Validation { fields }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::Authentication => ErrorCode::AuthenticationFailed,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// HTTP status code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.error_code().http_status()
    }

    /// The JSON error envelope returned to clients.
    ///
    /// Shape: `{error, message, timestamp}` for most categories,
    /// `{error, fields, timestamp}` for validation failures. The 500
    /// category carries a fixed message; the underlying cause is
    /// logged at the boundary, never serialized here.
    #[must_use]
    pub fn envelope(&self) -> serde_json::Value {
        let timestamp = chrono::Utc::now().to_rfc3339();
        match self {
            Self::NotFound { .. } => serde_json::json!({
                "error": "Not Found",
                "message": self.to_string(),
                "timestamp": timestamp,
            }),
            Self::Validation { fields } => serde_json::json!({
                "error": "Validation failed",
                "fields": fields,
                "timestamp": timestamp,
            }),
            Self::Authentication => serde_json::json!({
                "error": "Authentication failed",
                "message": "Invalid credentials",
                "timestamp": timestamp,
            }),
            _ => serde_json::json!({
                "error": "Internal Server Error",
                "message": "An unexpected error occurred",
                "timestamp": timestamp,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::NotFound { entity: "Lead", id: 7 }.http_status(),
            404
        );
        assert_eq!(Error::validation("email", "required").http_status(), 400);
        assert_eq!(Error::Authentication.http_status(), 401);
        assert_eq!(Error::Internal("boom".into()).http_status(), 500);
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::NotFound { entity: "Lead", id: 42 };
        assert_eq!(err.to_string(), "Lead not found with id: 42");
    }

    #[test]
    fn test_auth_envelope_is_generic() {
        let env = Error::Authentication.envelope();
        assert_eq!(env["error"], "Authentication failed");
        assert_eq!(env["message"], "Invalid credentials");
    }

    #[test]
    fn test_internal_envelope_hides_detail() {
        let env = Error::Internal("secret stack trace".into()).envelope();
        assert_eq!(env["message"], "An unexpected error occurred");
        assert!(!env.to_string().contains("secret"));
    }

    #[test]
    fn test_validation_envelope_has_fields() {
        let env = Error::validation("message", "must be at least 10 characters").envelope();
        assert_eq!(env["fields"]["message"], "must be at least 10 characters");
        assert!(env.get("message").is_none());
    }
}
