use snapshelf_core::AppError;

/// Metadata store errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record rejected: {0}")]
    Rejected(String),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        AppError::Persistence(err.to_string())
    }
}
