use serde::{Deserialize, Serialize};

/// Body of `POST /upload` on the indexing backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadNotification {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "photoURLs")]
    pub photo_urls: Vec<String>,
}

/// Body of `POST /search` on the indexing backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub text: String,
    pub k: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub rank: u32,
    pub score: f64,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}
