//! Error types module
//!
//! `AppError` is the umbrella error used at the edges of the application (CLI,
//! configuration, wiring). The pipeline stages keep their own narrow error
//! types (`ValidationError` here, `StorageError`, `PersistenceError` and
//! `NotificationError` in their crates); each of those converts into
//! `AppError` so callers can bubble them up with `?`.

use std::io;

use crate::validation::ValidationError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for best-effort work that failed
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether repeating the operation could succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::Notification(_) => "NOTIFICATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "INTERNAL_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Storage(_) | AppError::Persistence(_) | AppError::Notification(_)
        )
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::Validation(_) | AppError::InvalidInput(_) | AppError::Unauthorized(_) => {
                LogLevel::Debug
            }
            AppError::Notification(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}
