use async_trait::async_trait;
use snapshelf_core::models::{ImageRecord, NewImageRecord};

use crate::PersistenceResult;

/// Per-user image record collection.
#[async_trait]
pub trait ImageRecordStore: Send + Sync {
    /// Insert a record under `user_id` and return its id. The store assigns
    /// `uploaded_at`.
    async fn create(&self, user_id: &str, record: NewImageRecord) -> PersistenceResult<String>;

    /// All records of `user_id`, newest first.
    async fn list(&self, user_id: &str) -> PersistenceResult<Vec<ImageRecord>>;
}
