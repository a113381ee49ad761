//! Progress view over a running batch.
//!
//! `ProgressReporter` only reads task cells. It never changes task state.

use futures::future::select_all;
use serde::Serialize;
use snapshelf_core::models::UploadStatus;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tokio::sync::watch;

use crate::task::TaskSnapshot;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Aggregate view of a batch at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub is_settled: bool,
    pub tasks: Vec<TaskSnapshot>,
}

impl BatchProgress {
    pub fn from_snapshots(tasks: Vec<TaskSnapshot>) -> Self {
        let completed = count(&tasks, UploadStatus::Completed);
        let failed = count(&tasks, UploadStatus::Error);
        Self {
            total: tasks.len(),
            completed,
            failed,
            is_settled: completed + failed == tasks.len(),
            tasks,
        }
    }

    /// `"2 of 3 completed"`, with `" · 1 failed"` appended when anything failed.
    pub fn summary(&self) -> String {
        let mut line = format!("{} of {} completed", self.completed, self.total);
        if self.failed > 0 {
            line.push_str(&format!(" · {} failed", self.failed));
        }
        line
    }

    /// Share of completed tasks, 0.0 to 1.0. Failed tasks do not count.
    pub fn completed_fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64
    }
}

fn count(tasks: &[TaskSnapshot], status: UploadStatus) -> usize {
    tasks.iter().filter(|t| t.status == status).count()
}

/// Status text shown next to a task.
pub fn status_text(task: &TaskSnapshot) -> String {
    match task.status {
        UploadStatus::Pending => "Waiting...".to_string(),
        UploadStatus::Uploading => "Uploading...".to_string(),
        UploadStatus::Completed => "Completed ✓".to_string(),
        UploadStatus::Error => format!(
            "Failed: {}",
            task.error_message.as_deref().unwrap_or_default()
        ),
    }
}

/// Size in MB with two decimals.
pub fn format_size_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}

impl Display for BatchProgress {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "{}", self.summary())?;
        for task in &self.tasks {
            writeln!(
                f,
                "  {} ({}) {}",
                task.file_name,
                format_size_mb(task.file_size),
                status_text(task)
            )?;
        }
        Ok(())
    }
}

/// Subscribes to every task cell of a batch.
pub struct ProgressReporter {
    receivers: Vec<watch::Receiver<TaskSnapshot>>,
}

impl ProgressReporter {
    pub(crate) fn new(receivers: Vec<watch::Receiver<TaskSnapshot>>) -> Self {
        Self { receivers }
    }

    /// Current state of the batch.
    pub fn current(&self) -> BatchProgress {
        BatchProgress::from_snapshots(self.receivers.iter().map(|rx| rx.borrow().clone()).collect())
    }

    /// Wait until any task changes and return the new state.
    ///
    /// Changes made since the last call are returned immediately. Returns
    /// `None` once the batch has settled and every change has been seen, or
    /// when the batch has been dropped.
    pub async fn changed(&mut self) -> Option<BatchProgress> {
        if self.receivers.is_empty() {
            return None;
        }

        let pending_change = self
            .receivers
            .iter()
            .any(|rx| rx.has_changed().unwrap_or(false));
        if !pending_change {
            if self.current().is_settled {
                return None;
            }

            let result = {
                let (result, _, _) =
                    select_all(self.receivers.iter_mut().map(|rx| Box::pin(rx.changed()))).await;
                result
            };
            result.ok()?;
        }

        Some(BatchProgress::from_snapshots(
            self.receivers
                .iter_mut()
                .map(|rx| rx.borrow_and_update().clone())
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str, size: u64, status: UploadStatus) -> TaskSnapshot {
        TaskSnapshot {
            id: format!("id-{}", name),
            file_name: name.to_string(),
            file_size: size,
            status,
            progress: 0,
            result_url: None,
            error_message: (status == UploadStatus::Error).then(|| "Upload failed: quota".to_string()),
        }
    }

    #[test]
    fn summary_mentions_failures_only_when_present() {
        let progress = BatchProgress::from_snapshots(vec![
            snapshot("a.png", 1, UploadStatus::Completed),
            snapshot("b.png", 1, UploadStatus::Uploading),
        ]);
        assert_eq!(progress.summary(), "1 of 2 completed");
        assert!(!progress.is_settled);

        let progress = BatchProgress::from_snapshots(vec![
            snapshot("a.png", 1, UploadStatus::Completed),
            snapshot("b.png", 1, UploadStatus::Error),
        ]);
        assert_eq!(progress.summary(), "1 of 2 completed · 1 failed");
        assert!(progress.is_settled);
        assert_eq!(progress.completed_fraction(), 0.5);
    }

    #[test]
    fn rows_render_status_and_size() {
        let progress = BatchProgress::from_snapshots(vec![
            snapshot("a.png", 1_572_864, UploadStatus::Pending),
            snapshot("b.png", 0, UploadStatus::Uploading),
            snapshot("c.png", 1024 * 1024, UploadStatus::Completed),
            snapshot("d.png", 10, UploadStatus::Error),
        ]);

        let rendered = progress.to_string();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "1 of 4 completed · 1 failed");
        assert_eq!(lines[1], "  a.png (1.50 MB) Waiting...");
        assert_eq!(lines[2], "  b.png (0.00 MB) Uploading...");
        assert_eq!(lines[3], "  c.png (1.00 MB) Completed ✓");
        assert_eq!(lines[4], "  d.png (0.00 MB) Failed: Upload failed: quota");
    }

    #[tokio::test]
    async fn empty_reporter_has_nothing_to_wait_for() {
        let mut reporter = ProgressReporter::new(Vec::new());
        assert!(reporter.changed().await.is_none());
        assert_eq!(reporter.current().total, 0);
    }

    #[tokio::test]
    async fn reports_each_change_then_stops() {
        let (tx, rx) = watch::channel(snapshot("a.png", 1, UploadStatus::Pending));
        let mut reporter = ProgressReporter::new(vec![rx]);

        tx.send_modify(|s| s.status = UploadStatus::Uploading);
        let progress = reporter.changed().await.unwrap();
        assert_eq!(progress.tasks[0].status, UploadStatus::Uploading);

        tx.send_modify(|s| s.status = UploadStatus::Completed);
        let progress = reporter.changed().await.unwrap();
        assert!(progress.is_settled);

        assert!(reporter.changed().await.is_none());
    }
}
