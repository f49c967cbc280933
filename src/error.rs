//! Error types for cloudshelf.

use thiserror::Error;

/// Common error type for cloudshelf.
#[derive(Error, Debug)]
pub enum ShelfError {
    /// Database error.
    ///
    /// Wraps errors from the storage backend. Database errors from sqlx are
    /// automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or unknown caller identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Validation error for caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found, not owned, or in the wrong lifecycle state.
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate name.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An item was shared with its own owner.
    #[error("cannot share an item with yourself")]
    SelfShare,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Stable error codes handed to the response layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Unauthorized,
    ValidationFailed,
    NotFound,
    Conflict,
    SelfShareRejected,
    InternalError,
}

impl ErrorCode {
    /// Get the string form used in response bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::SelfShareRejected => "SELF_SHARE_REJECTED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::Unauthorized => 401,
            ErrorCode::ValidationFailed => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::Conflict => 409,
            ErrorCode::SelfShareRejected => 400,
            ErrorCode::InternalError => 500,
        }
    }
}

impl ShelfError {
    /// Get the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ShelfError::Unauthorized(_) => ErrorCode::Unauthorized,
            ShelfError::Validation(_) => ErrorCode::ValidationFailed,
            ShelfError::NotFound(_) => ErrorCode::NotFound,
            ShelfError::Conflict(_) => ErrorCode::Conflict,
            ShelfError::SelfShare => ErrorCode::SelfShareRejected,
            ShelfError::Database(_)
            | ShelfError::DatabaseConnection(_)
            | ShelfError::Io(_)
            | ShelfError::Config(_) => ErrorCode::InternalError,
        }
    }

    /// Message safe to show to callers.
    ///
    /// Infrastructure faults are reported generically so storage details
    /// never leak into responses.
    pub fn public_message(&self) -> String {
        match self.code() {
            ErrorCode::InternalError => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for ShelfError {
    fn from(e: sqlx::Error) -> Self {
        ShelfError::Database(e.to_string())
    }
}

impl From<validator::ValidationErrors> for ShelfError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("invalid value for {field}"))
                    })
                    .collect();
                format!("{field}: {}", messages.join(", "))
            })
            .collect();
        fields.sort();
        ShelfError::Validation(fields.join("; "))
    }
}

/// Result type alias for cloudshelf operations.
pub type Result<T> = std::result::Result<T, ShelfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error_display() {
        let err = ShelfError::NotFound("item".to_string());
        assert_eq!(err.to_string(), "item not found");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.code().status_code(), 404);
    }

    #[test]
    fn test_validation_error_display() {
        let err = ShelfError::Validation("name is required".to_string());
        assert_eq!(err.to_string(), "validation error: name is required");
        assert_eq!(err.code().status_code(), 400);
    }

    #[test]
    fn test_conflict_and_self_share_codes() {
        assert_eq!(
            ShelfError::Conflict("folder name already exists".to_string())
                .code()
                .status_code(),
            409
        );
        assert_eq!(ShelfError::SelfShare.code(), ErrorCode::SelfShareRejected);
        assert_eq!(ShelfError::SelfShare.code().as_str(), "SELF_SHARE_REJECTED");
    }

    #[test]
    fn test_unauthorized_code() {
        let err = ShelfError::Unauthorized("missing caller".to_string());
        assert_eq!(err.code().status_code(), 401);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ShelfError::Database("no such table: items".to_string());
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.public_message(), "internal server error");

        let err = ShelfError::NotFound("item".to_string());
        assert_eq!(err.public_message(), "item not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ShelfError = io_err.into();
        assert!(matches!(err, ShelfError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_validation_errors_conversion() {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "name",
            validator::ValidationError::new("length").with_message("too long".into()),
        );
        let err: ShelfError = errors.into();
        assert_eq!(err.to_string(), "validation error: name: too long");
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(ShelfError::SelfShare)
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
