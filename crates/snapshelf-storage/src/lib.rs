//! Snapshelf Storage Library
//!
//! This crate provides the binary object store abstraction and its
//! implementations (local filesystem and in-memory).
//!
//! # Storage key format
//!
//! Keys are user-scoped: `user-images/{uid}/{uid}-{timestamp_ms}.{ext}`.
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{image_storage_key, validate_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use snapshelf_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult};
