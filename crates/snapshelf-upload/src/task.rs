//! One file's upload: identity, status cell and the store-then-persist pipeline.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use snapshelf_core::models::{NewImageRecord, SourceFile, UploadStatus};
use snapshelf_db::{ImageRecordStore, PersistenceError};
use snapshelf_storage::{image_storage_key, Storage, StorageError};
use std::sync::Mutex;
use tokio::sync::watch;

use crate::clock::KeyClock;
use crate::preview::PreviewHandle;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

// Progress checkpoints while uploading. 100 is reserved for `Completed`.
const PROGRESS_STORING: u8 = 10;
const PROGRESS_STORED: u8 = 50;
const PROGRESS_PERSISTED: u8 = 90;
const PROGRESS_DONE: u8 = 100;

/// `{timestamp_ms}-{9 lowercase alphanumerics}`.
pub fn generate_task_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Read model of a task at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: String,
    pub file_name: String,
    pub file_size: u64,
    pub status: UploadStatus,
    pub progress: u8,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
}

impl TaskSnapshot {
    fn pending(id: &str, source: &SourceFile) -> Self {
        Self {
            id: id.to_string(),
            file_name: source.name.clone(),
            file_size: source.size(),
            status: UploadStatus::Pending,
            progress: 0,
            result_url: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, thiserror::Error)]
enum StageError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Unit of work for one accepted file.
///
/// The status cell has exactly one writer: the task's own pipeline. Everyone
/// else reads snapshots or subscribes for changes.
#[derive(Debug)]
pub struct UploadTask {
    id: String,
    source: SourceFile,
    preview: Mutex<Option<PreviewHandle>>,
    cell: watch::Sender<TaskSnapshot>,
}

impl UploadTask {
    pub fn new(id: String, source: SourceFile, preview: PreviewHandle) -> Self {
        let (cell, _) = watch::channel(TaskSnapshot::pending(&id, &source));
        Self {
            id,
            source,
            preview: Mutex::new(Some(preview)),
            cell,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.cell.borrow().clone()
    }

    pub fn status(&self) -> UploadStatus {
        self.cell.borrow().status
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.cell.subscribe()
    }

    /// URI of the preview, while it has not been released.
    pub fn preview_uri(&self) -> Option<String> {
        self.preview
            .lock()
            .ok()
            .and_then(|preview| preview.as_ref().map(|p| p.uri().to_string()))
    }

    pub(crate) fn take_preview(&self) -> Option<PreviewHandle> {
        self.preview.lock().ok().and_then(|mut preview| preview.take())
    }

    /// Apply `next` if the state machine allows it.
    fn transition(&self, next: UploadStatus, apply: impl FnOnce(&mut TaskSnapshot)) -> bool {
        self.cell.send_if_modified(|snapshot| {
            if !snapshot.status.can_transition_to(next) {
                return false;
            }
            snapshot.status = next;
            apply(snapshot);
            true
        })
    }

    /// Raise progress while uploading. Lower values and terminal tasks are ignored.
    fn advance(&self, progress: u8) {
        let progress = progress.min(PROGRESS_DONE - 1);
        self.cell.send_if_modified(|snapshot| {
            if snapshot.status != UploadStatus::Uploading || progress <= snapshot.progress {
                return false;
            }
            snapshot.progress = progress;
            true
        });
    }

    fn begin(&self) -> bool {
        self.transition(UploadStatus::Uploading, |_| {})
    }

    fn complete(&self, url: String) -> bool {
        self.transition(UploadStatus::Completed, |snapshot| {
            snapshot.progress = PROGRESS_DONE;
            snapshot.result_url = Some(url);
        })
    }

    fn fail(&self, message: String) -> bool {
        self.transition(UploadStatus::Error, |snapshot| {
            snapshot.error_message = Some(message);
        })
    }

    /// Run the pipeline to a terminal status and return the stored URL on
    /// success. Failures are recorded on the task, never returned.
    ///
    /// A task that has already been started is not run again. The call waits
    /// for the running pipeline to settle and returns its URL.
    pub async fn run(
        &self,
        user_id: &str,
        storage: &dyn Storage,
        records: &dyn ImageRecordStore,
        clock: &KeyClock,
    ) -> Option<String> {
        if !self.begin() {
            tracing::debug!(task_id = %self.id, status = %self.status(), "Upload task already started");
            return self.settled().await;
        }
        tracing::debug!(task_id = %self.id, file_name = %self.source.name, "Upload task started");

        match self.execute(user_id, storage, records, clock).await {
            Ok(url) => {
                self.complete(url.clone());
                tracing::info!(task_id = %self.id, url = %url, "Upload task completed");
                Some(url)
            }
            Err(e) => {
                tracing::warn!(task_id = %self.id, error = %e, "Upload task failed");
                self.fail(e.to_string());
                None
            }
        }
    }

    /// Wait until the task is terminal and return its URL.
    async fn settled(&self) -> Option<String> {
        let mut receiver = self.subscribe();
        let url = receiver
            .wait_for(TaskSnapshot::is_terminal)
            .await
            .ok()?
            .result_url
            .clone();
        url
    }

    async fn execute(
        &self,
        user_id: &str,
        storage: &dyn Storage,
        records: &dyn ImageRecordStore,
        clock: &KeyClock,
    ) -> Result<String, StageError> {
        let storage_key = image_storage_key(
            user_id,
            clock.next_timestamp_ms(),
            self.source.key_extension(),
        );

        self.advance(PROGRESS_STORING);
        let url = storage
            .upload_with_key(
                &storage_key,
                self.source.data.clone(),
                &self.source.content_type,
            )
            .await?;
        self.advance(PROGRESS_STORED);
        tracing::debug!(task_id = %self.id, storage_key = %storage_key, "Stored image bytes");

        let record = NewImageRecord {
            url: url.clone(),
            storage_path: storage_key,
            file_name: self.source.name.clone(),
            file_size: self.source.size(),
            file_type: self.source.content_type.clone(),
        };
        let record_id = records.create(user_id, record).await?;
        self.advance(PROGRESS_PERSISTED);
        tracing::debug!(task_id = %self.id, record_id = %record_id, "Persisted image record");

        Ok(url)
    }
}
