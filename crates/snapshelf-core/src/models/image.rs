use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata written for every stored image. There is no `uploaded_at`:
/// the record store assigns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewImageRecord {
    pub url: String,
    pub storage_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
}

/// A persisted image record as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub url: String,
    pub storage_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl ImageRecord {
    pub fn from_new(id: String, record: NewImageRecord, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            id,
            url: record.url,
            storage_path: record.storage_path,
            file_name: record.file_name,
            file_size: record.file_size,
            file_type: record.file_type,
            uploaded_at,
        }
    }
}
