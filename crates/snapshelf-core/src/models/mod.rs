//! Domain models
//!
//! Types shared between the pipeline crates: the files a user selects, the
//! metadata records persisted for each stored image, and the wire shapes of
//! the indexing backend.

pub mod image;
pub mod search;
pub mod upload;

pub use image::{ImageRecord, NewImageRecord};
pub use search::{SearchHit, SearchRequest, SearchResponse, UploadNotification};
pub use upload::{AuthenticatedUser, SourceFile, UploadStatus};
