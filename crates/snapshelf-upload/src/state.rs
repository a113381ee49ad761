//! Batch state: the fixed, ordered set of tasks created from one selection.

use snapshelf_core::models::{AuthenticatedUser, SourceFile, UploadStatus};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::UploadError;
use crate::preview::{PreviewHandle, PreviewRegistry};
use crate::progress::ProgressReporter;
use crate::task::{generate_task_id, TaskSnapshot, UploadTask};

/// Tasks of one batch, in creation order. The set never changes after
/// creation; counts are derived from the task cells on every call.
#[derive(Debug)]
pub struct BatchState {
    user: AuthenticatedUser,
    tasks: Vec<UploadTask>,
    notification_claimed: AtomicBool,
}

impl BatchState {
    /// One pending task per file, each with a fresh id and preview.
    pub fn new(user: AuthenticatedUser, files: Vec<SourceFile>, previews: &PreviewRegistry) -> Self {
        let mut seen = HashSet::with_capacity(files.len());
        let tasks = files
            .into_iter()
            .map(|file| {
                let mut id = generate_task_id();
                while !seen.insert(id.clone()) {
                    id = generate_task_id();
                }
                let preview = previews.issue(&file);
                UploadTask::new(id, file, preview)
            })
            .collect();

        Self {
            user,
            tasks,
            notification_claimed: AtomicBool::new(false),
        }
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    pub fn tasks(&self) -> &[UploadTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn snapshots(&self) -> Vec<TaskSnapshot> {
        self.tasks.iter().map(UploadTask::snapshot).collect()
    }

    pub fn completed_count(&self) -> usize {
        self.count_status(UploadStatus::Completed)
    }

    pub fn failed_count(&self) -> usize {
        self.count_status(UploadStatus::Error)
    }

    fn count_status(&self, status: UploadStatus) -> usize {
        self.tasks.iter().filter(|t| t.status() == status).count()
    }

    pub fn is_settled(&self) -> bool {
        self.completed_count() + self.failed_count() == self.tasks.len()
    }

    /// True exactly once per batch: for the run that gets to notify the
    /// indexing backend.
    pub(crate) fn claim_notification(&self) -> bool {
        !self.notification_claimed.swap(true, Ordering::AcqRel)
    }

    /// Live view for progress rendering.
    pub fn reporter(&self) -> ProgressReporter {
        ProgressReporter::new(self.tasks.iter().map(UploadTask::subscribe).collect())
    }

    /// Close the batch and release every preview.
    ///
    /// Refused while any task is still pending or uploading. Returns the
    /// number of previews released by this call; once every preview has
    /// been released, further calls release nothing and return 0.
    pub fn dismiss(&self) -> Result<usize, UploadError> {
        let unfinished = self.tasks.iter().filter(|t| !t.is_terminal()).count();
        if unfinished > 0 {
            return Err(UploadError::NotSettled {
                unfinished,
                total: self.tasks.len(),
            });
        }

        let released = self
            .tasks
            .iter()
            .filter_map(UploadTask::take_preview)
            .map(PreviewHandle::release)
            .filter(|released| *released)
            .count();
        tracing::debug!(released, user_id = %self.user.uid, "Upload batch dismissed");

        Ok(released)
    }
}
