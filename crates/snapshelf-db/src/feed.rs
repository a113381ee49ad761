//! Ordered live view over a record store.
//!
//! `RecordFeed` wraps any `ImageRecordStore`. After each successful create it
//! re-reads the owner's records and publishes the newest-first list on a
//! per-user `watch` channel, so subscribers always see a complete ordered
//! snapshot rather than individual inserts.

use async_trait::async_trait;
use snapshelf_core::models::{ImageRecord, NewImageRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::{ImageRecordStore, PersistenceError, PersistenceResult};

#[derive(Clone)]
pub struct RecordFeed {
    inner: Arc<dyn ImageRecordStore>,
    channels: Arc<Mutex<HashMap<String, Arc<UserChannel>>>>,
}

/// One user's channel. Refreshes hold `refresh` across list and send, so
/// snapshots are published in the order they were read.
struct UserChannel {
    sender: watch::Sender<Vec<ImageRecord>>,
    refresh: tokio::sync::Mutex<()>,
}

/// Live, ordered view of one user's records.
pub struct RecordSubscription {
    receiver: watch::Receiver<Vec<ImageRecord>>,
}

impl RecordSubscription {
    /// Latest snapshot, newest first.
    pub fn current(&self) -> Vec<ImageRecord> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next snapshot. Returns `None` once the feed is dropped.
    pub async fn next(&mut self) -> Option<Vec<ImageRecord>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

impl RecordFeed {
    pub fn new(inner: Arc<dyn ImageRecordStore>) -> Self {
        Self {
            inner,
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to `user_id`'s records. The subscription starts with the
    /// current list.
    pub async fn subscribe(&self, user_id: &str) -> PersistenceResult<RecordSubscription> {
        if let Some(channel) = self.channel(user_id) {
            return Ok(RecordSubscription {
                receiver: channel.sender.subscribe(),
            });
        }

        let snapshot = self.inner.list(user_id).await?;

        let mut channels = self.channels.lock().map_err(poisoned)?;
        let channel = channels.entry(user_id.to_string()).or_insert_with(|| {
            Arc::new(UserChannel {
                sender: watch::channel(snapshot).0,
                refresh: tokio::sync::Mutex::new(()),
            })
        });
        Ok(RecordSubscription {
            receiver: channel.sender.subscribe(),
        })
    }

    fn channel(&self, user_id: &str) -> Option<Arc<UserChannel>> {
        self.channels
            .lock()
            .ok()
            .and_then(|channels| channels.get(user_id).cloned())
    }

    async fn publish(&self, user_id: &str) {
        let Some(channel) = self.channel(user_id) else {
            return;
        };

        let _refresh = channel.refresh.lock().await;
        match self.inner.list(user_id).await {
            Ok(snapshot) => {
                channel.sender.send_replace(snapshot);
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, "Failed to refresh record feed");
            }
        }
    }
}

fn poisoned<T>(_: T) -> PersistenceError {
    PersistenceError::Unavailable("record feed lock poisoned".to_string())
}

#[async_trait]
impl ImageRecordStore for RecordFeed {
    async fn create(&self, user_id: &str, record: NewImageRecord) -> PersistenceResult<String> {
        let id = self.inner.create(user_id, record).await?;
        self.publish(user_id).await;
        Ok(id)
    }

    async fn list(&self, user_id: &str) -> PersistenceResult<Vec<ImageRecord>> {
        self.inner.list(user_id).await
    }
}
