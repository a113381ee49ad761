//! Batch orchestration: fan out one task per file, join when all are
//! terminal, then hand the successful URLs to the indexing backend.

use futures::future::join_all;
use snapshelf_core::models::{AuthenticatedUser, SourceFile};
use snapshelf_db::ImageRecordStore;
use snapshelf_index::IndexNotifier;
use snapshelf_storage::Storage;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::clock::KeyClock;
use crate::error::UploadError;
use crate::preview::PreviewRegistry;
use crate::state::BatchState;

/// Result of one batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// URLs of completed tasks, in task creation order.
    pub urls: Vec<String>,
    pub completed: usize,
    pub failed: usize,
    /// Detached indexing notification, when one was dispatched. The batch is
    /// complete whether or not this is awaited.
    pub notification: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct BatchOrchestrator {
    storage: Arc<dyn Storage>,
    records: Arc<dyn ImageRecordStore>,
    notifier: Option<Arc<dyn IndexNotifier>>,
    previews: PreviewRegistry,
    clock: Arc<KeyClock>,
}

impl BatchOrchestrator {
    pub fn new(storage: Arc<dyn Storage>, records: Arc<dyn ImageRecordStore>) -> Self {
        Self {
            storage,
            records,
            notifier: None,
            previews: PreviewRegistry::new(),
            clock: Arc::new(KeyClock::new()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn IndexNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Create the batch for an accepted selection. All tasks start pending so
    /// they can be shown before any upload begins.
    pub fn prepare(
        &self,
        user: Option<&AuthenticatedUser>,
        files: Vec<SourceFile>,
    ) -> Result<BatchState, UploadError> {
        let user = user.ok_or(UploadError::NotAuthenticated)?;
        Ok(BatchState::new(user.clone(), files, &self.previews))
    }

    /// Run every task of `batch` concurrently and wait until all of them are
    /// terminal.
    ///
    /// A failing task never stops its siblings. Failures stay on the tasks;
    /// this method itself cannot fail. When at least one URL was produced
    /// and a notifier is configured, the notifier is dispatched on a
    /// detached task and its failure is only logged.
    ///
    /// Tasks that were already started by another call are not run again;
    /// this call waits for them to settle and reports the same URLs. Only
    /// the first call to produce URLs notifies the indexing backend.
    pub async fn run_batch(&self, batch: &BatchState) -> BatchOutcome {
        let user_id = batch.user().uid.as_str();
        tracing::info!(user_id = %user_id, task_count = batch.len(), "Upload batch started");

        join_all(batch.tasks().iter().map(|task| {
            task.run(
                user_id,
                self.storage.as_ref(),
                self.records.as_ref(),
                &self.clock,
            )
        }))
        .await;

        let urls: Vec<String> = batch
            .tasks()
            .iter()
            .filter_map(|task| task.snapshot().result_url)
            .collect();
        let completed = batch.completed_count();
        let failed = batch.failed_count();

        tracing::info!(
            user_id = %user_id,
            completed,
            failed,
            "Upload batch settled"
        );

        let notification = match &self.notifier {
            Some(notifier) if !urls.is_empty() && batch.claim_notification() => Some(dispatch_notification(
                Arc::clone(notifier),
                user_id.to_string(),
                urls.clone(),
            )),
            _ => None,
        };

        BatchOutcome {
            urls,
            completed,
            failed,
            notification,
        }
    }
}

/// Notify the indexing backend without blocking the caller.
fn dispatch_notification(
    notifier: Arc<dyn IndexNotifier>,
    user_id: String,
    urls: Vec<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.notify_upload(&user_id, &urls).await {
            Ok(_) => {
                tracing::debug!(user_id = %user_id, url_count = urls.len(), "Indexing notification sent");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    user_id = %user_id,
                    url_count = urls.len(),
                    "Failed to notify indexing backend"
                );
            }
        }
    })
}
