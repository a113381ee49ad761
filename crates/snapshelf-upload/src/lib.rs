//! Batch upload orchestration
//!
//! One user selection becomes one batch. Every accepted file gets an
//! [`UploadTask`] that moves through `pending -> uploading -> completed|error`
//! while it stores the bytes and persists the metadata record. The
//! [`BatchOrchestrator`] runs all tasks of a batch concurrently, waits for
//! every one of them to reach a terminal status, returns the successful URLs
//! in creation order and hands them to the indexing backend without waiting
//! for it.
//!
//! Each task owns its status cell and is the only writer to it. Readers
//! ([`BatchState`], [`ProgressReporter`]) only take snapshots.

pub mod clock;
pub mod error;
pub mod orchestrator;
pub mod preview;
pub mod progress;
pub mod state;
pub mod task;

// Test helpers (only available in test mode)
#[cfg(test)]
pub mod test_helpers;

pub use error::UploadError;
pub use orchestrator::{BatchOrchestrator, BatchOutcome};
pub use preview::{PreviewHandle, PreviewRegistry};
pub use progress::{BatchProgress, ProgressReporter};
pub use state::BatchState;
pub use task::{generate_task_id, TaskSnapshot, UploadTask};
