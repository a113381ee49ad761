//! Test doubles for the upload pipeline.

use async_trait::async_trait;
use bytes::Bytes;
use snapshelf_core::models::SourceFile;
use snapshelf_core::validation::{content_type_for_extension, trailing_extension};
use snapshelf_index::{IndexAck, IndexNotifier, NotificationError};
use snapshelf_storage::{MemoryStorage, Storage, StorageBackend, StorageResult};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A small image file whose content type follows its extension.
pub fn image(name: &str) -> SourceFile {
    let content_type = trailing_extension(name)
        .map(content_type_for_extension)
        .unwrap_or_default();
    SourceFile::new(name, content_type, format!("bytes of {}", name).into_bytes())
}

/// Memory storage whose uploads can be held back until released, so tests
/// decide which task finishes first.
#[derive(Default)]
pub struct GatedStorage {
    inner: MemoryStorage,
    gates: Mutex<Vec<(String, Arc<Notify>)>>,
    completed: Mutex<Vec<String>>,
}

impl GatedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    /// Uploads to keys ending with `suffix` wait until the returned gate is notified.
    pub fn gate_keys_ending_with(&self, suffix: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .push((suffix.to_string(), Arc::clone(&gate)));
        gate
    }

    /// Keys of successful uploads, in the order they finished.
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    fn gate_for(&self, key: &str) -> Option<Arc<Notify>> {
        self.gates
            .lock()
            .unwrap()
            .iter()
            .find(|(suffix, _)| key.ends_with(suffix.as_str()))
            .map(|(_, gate)| Arc::clone(gate))
    }
}

#[async_trait]
impl Storage for GatedStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        if let Some(gate) = self.gate_for(storage_key) {
            gate.notified().await;
        }
        let url = self
            .inner
            .upload_with_key(storage_key, data, content_type)
            .await?;
        self.completed.lock().unwrap().push(storage_key.to_string());
        Ok(url)
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        self.inner.download(storage_key).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.inner.delete(storage_key).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.inner.exists(storage_key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Notifier that records every call and optionally fails.
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IndexNotifier for RecordingNotifier {
    async fn notify_upload(
        &self,
        user_id: &str,
        urls: &[String],
    ) -> Result<IndexAck, NotificationError> {
        self.calls
            .lock()
            .unwrap()
            .push((user_id.to_string(), urls.to_vec()));
        if self.fail {
            return Err(NotificationError::Status {
                status: reqwest::StatusCode::BAD_GATEWAY,
                body: String::new(),
            });
        }
        Ok(IndexAck(serde_json::Value::Null))
    }
}
