//! Metadata record store for uploaded images
//!
//! Every stored image gets one record under its owner. Records are created by
//! the upload pipeline and read back newest first by the gallery. `RecordFeed`
//! adds ordered live snapshots on top of any store.

pub mod error;
pub mod feed;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

pub use error::{PersistenceError, PersistenceResult};
pub use feed::{RecordFeed, RecordSubscription};
pub use memory::MemoryRecordStore;
#[cfg(feature = "postgres")]
pub use postgres::PgImageRecordStore;
pub use traits::ImageRecordStore;
