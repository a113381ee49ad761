//! Timestamps for storage keys.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Millisecond clock that never hands out the same value twice.
///
/// Storage keys are `{uid}-{timestamp_ms}.{ext}`, so two files of one batch
/// started in the same millisecond would otherwise overwrite each other.
/// When the wall clock has not moved past the last value, the last value
/// plus one is returned instead.
#[derive(Debug, Default)]
pub struct KeyClock {
    last: AtomicI64,
}

impl KeyClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_timestamp_ms(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }
}
