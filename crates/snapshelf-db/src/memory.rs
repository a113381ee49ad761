//! In-memory record store.

use async_trait::async_trait;
use chrono::Utc;
use snapshelf_core::models::{ImageRecord, NewImageRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{ImageRecordStore, PersistenceError, PersistenceResult};

/// Records kept per user in insertion order. Creates for file names that
/// contain a registered fault pattern are rejected.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<HashMap<String, Vec<ImageRecord>>>>,
    fail_patterns: Arc<Mutex<Vec<String>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every record whose file name contains `pattern`.
    pub fn fail_file_names_matching(&self, pattern: impl Into<String>) {
        if let Ok(mut patterns) = self.fail_patterns.lock() {
            patterns.push(pattern.into());
        }
    }

    /// Total number of records across all users.
    pub fn count(&self) -> usize {
        self.records
            .lock()
            .map(|records| records.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    fn poisoned<T>(_: T) -> PersistenceError {
        PersistenceError::Unavailable("memory record store lock poisoned".to_string())
    }
}

#[async_trait]
impl ImageRecordStore for MemoryRecordStore {
    async fn create(&self, user_id: &str, record: NewImageRecord) -> PersistenceResult<String> {
        let rejected = self
            .fail_patterns
            .lock()
            .map_err(Self::poisoned)?
            .iter()
            .any(|pattern| record.file_name.contains(pattern.as_str()));
        if rejected {
            return Err(PersistenceError::Rejected(format!(
                "Injected failure for {}",
                record.file_name
            )));
        }

        let id = Uuid::new_v4().simple().to_string();
        let stored = ImageRecord::from_new(id.clone(), record, Utc::now());

        self.records
            .lock()
            .map_err(Self::poisoned)?
            .entry(user_id.to_string())
            .or_default()
            .push(stored);

        tracing::debug!(user_id = %user_id, record_id = %id, "Image record created");

        Ok(id)
    }

    async fn list(&self, user_id: &str) -> PersistenceResult<Vec<ImageRecord>> {
        let mut records: Vec<ImageRecord> = self
            .records
            .lock()
            .map_err(Self::poisoned)?
            .get(user_id)
            .cloned()
            .unwrap_or_default();

        // Newest first; records created in the same instant keep reverse
        // insertion order.
        records.reverse();
        records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> NewImageRecord {
        NewImageRecord {
            url: format!("memory://user-images/u/{}", name),
            storage_path: format!("user-images/u/{}", name),
            file_name: name.to_string(),
            file_size: 3,
            file_type: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn lists_newest_first_per_user() {
        let store = MemoryRecordStore::new();
        store.create("u", record("first.png")).await.unwrap();
        store.create("u", record("second.png")).await.unwrap();
        store.create("other", record("theirs.png")).await.unwrap();

        let names: Vec<_> = store
            .list("u")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.file_name)
            .collect();
        assert_eq!(names, ["second.png", "first.png"]);
        assert_eq!(store.count(), 3);
    }

    #[tokio::test]
    async fn assigns_ids_and_timestamps() {
        let store = MemoryRecordStore::new();
        let before = Utc::now();
        let id = store.create("u", record("a.png")).await.unwrap();

        let records = store.list("u").await.unwrap();
        assert_eq!(records[0].id, id);
        assert!(records[0].uploaded_at >= before);
        assert_eq!(records[0].storage_path, "user-images/u/a.png");
    }

    #[tokio::test]
    async fn injected_failure_rejects_and_stores_nothing() {
        let store = MemoryRecordStore::new();
        store.fail_file_names_matching("bad");

        let result = store.create("u", record("bad.png")).await;
        assert!(matches!(result, Err(PersistenceError::Rejected(_))));
        assert!(store.list("u").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_user_has_no_records() {
        let store = MemoryRecordStore::new();
        assert!(store.list("nobody").await.unwrap().is_empty());
    }
}
