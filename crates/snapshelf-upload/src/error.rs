use snapshelf_core::constants::NOT_AUTHENTICATED_MESSAGE;
use snapshelf_core::AppError;

/// Errors raised by the batch lifecycle itself. Per-file failures never show
/// up here; they are recorded on the owning task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("{}", NOT_AUTHENTICATED_MESSAGE)]
    NotAuthenticated,

    #[error("Batch is not settled: {unfinished} of {total} uploads still running")]
    NotSettled { unfinished: usize, total: usize },
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NotAuthenticated => AppError::Unauthorized(err.to_string()),
            UploadError::NotSettled { .. } => AppError::InvalidInput(err.to_string()),
        }
    }
}
