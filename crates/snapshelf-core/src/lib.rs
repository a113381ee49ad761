//! Snapshelf Core Library
//!
//! This crate provides the domain models, error types, configuration and file
//! validation shared by every Snapshelf component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, UploadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
pub use validation::{FileValidator, ValidatedSelection, ValidationError};
