use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory storage, used for local runs without a disk layout and in tests.
///
/// Uploads to keys containing any of the registered fault patterns fail with
/// `UploadFailed`.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
    fail_patterns: Arc<RwLock<Vec<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upload whose key contains `pattern` fail.
    pub fn fail_keys_matching(&self, pattern: impl Into<String>) {
        if let Ok(mut patterns) = self.fail_patterns.write() {
            patterns.push(pattern.into());
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn url_for(key: &str) -> String {
        format!("memory://{}", key)
    }

    fn lock_error<T>(_: T) -> StorageError {
        StorageError::BackendError("memory storage lock poisoned".to_string())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        validate_key(storage_key)?;

        let should_fail = self
            .fail_patterns
            .read()
            .map_err(Self::lock_error)?
            .iter()
            .any(|pattern| storage_key.contains(pattern.as_str()));
        if should_fail {
            return Err(StorageError::UploadFailed(format!(
                "Injected failure for {}",
                storage_key
            )));
        }

        let size = data.len();
        self.objects
            .write()
            .map_err(Self::lock_error)?
            .insert(storage_key.to_string(), data);

        tracing::debug!(key = %storage_key, size_bytes = size, "Memory storage upload");

        Ok(Self::url_for(storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        validate_key(storage_key)?;
        self.objects
            .read()
            .map_err(Self::lock_error)?
            .get(storage_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        validate_key(storage_key)?;
        self.objects
            .write()
            .map_err(Self::lock_error)?
            .remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        validate_key(storage_key)?;
        Ok(self
            .objects
            .read()
            .map_err(Self::lock_error)?
            .contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_and_reports_url() {
        let storage = MemoryStorage::new();
        let url = storage
            .upload_with_key("user-images/u/u-1.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap();

        assert_eq!(url, "memory://user-images/u/u-1.png");
        assert_eq!(storage.keys(), ["user-images/u/u-1.png"]);
        assert_eq!(
            &storage.download("user-images/u/u-1.png").await.unwrap()[..],
            b"x"
        );
    }

    #[tokio::test]
    async fn injected_failures_only_hit_matching_keys() {
        let storage = MemoryStorage::new();
        storage.fail_keys_matching("broken");

        let failed = storage
            .upload_with_key("user-images/broken/x.png", Bytes::new(), "image/png")
            .await;
        assert!(matches!(failed, Err(StorageError::UploadFailed(_))));

        let ok = storage
            .upload_with_key("user-images/fine/x.png", Bytes::new(), "image/png")
            .await;
        assert!(ok.is_ok());
        assert_eq!(storage.len(), 1);
    }
}
