//! Local preview handles
//!
//! A preview is a revocable reference to the bytes of a picked file, used to
//! render the file while it uploads. Handles are issued by a
//! [`PreviewRegistry`], which tracks the live ones so leaks and double
//! releases are observable.

use bytes::Bytes;
use snapshelf_core::models::SourceFile;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Default)]
struct RegistryInner {
    live: Mutex<HashSet<String>>,
    released: AtomicUsize,
}

impl RegistryInner {
    /// Returns `true` when `uri` was live.
    fn revoke(&self, uri: &str) -> bool {
        let removed = self
            .live
            .lock()
            .map(|mut live| live.remove(uri))
            .unwrap_or(false);
        if removed {
            self.released.fetch_add(1, Ordering::SeqCst);
        } else {
            tracing::warn!(preview = %uri, "Preview released twice or never issued");
        }
        removed
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<RegistryInner>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a handle referencing `file`'s bytes.
    pub fn issue(&self, file: &SourceFile) -> PreviewHandle {
        let uri = format!("preview://{}", Uuid::new_v4());
        if let Ok(mut live) = self.inner.live.lock() {
            live.insert(uri.clone());
        }

        PreviewHandle {
            uri,
            data: file.data.clone(),
            registry: Arc::clone(&self.inner),
            released: false,
        }
    }

    /// Number of handles issued and not yet released.
    pub fn live_count(&self) -> usize {
        self.inner.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    /// Number of successful releases so far.
    pub fn released_count(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }

    pub fn is_live(&self, uri: &str) -> bool {
        self.inner
            .live
            .lock()
            .map(|live| live.contains(uri))
            .unwrap_or(false)
    }
}

/// Revocable preview of one source file.
///
/// `release` consumes the handle, so a handle cannot be released twice. A
/// handle dropped without `release` is revoked on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    uri: String,
    data: Bytes,
    registry: Arc<RegistryInner>,
    released: bool,
}

impl PreviewHandle {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn release(mut self) -> bool {
        self.released = true;
        self.registry.revoke(&self.uri)
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if !self.released {
            tracing::debug!(preview = %self.uri, "Preview dropped without release");
            self.registry.revoke(&self.uri);
        }
    }
}
