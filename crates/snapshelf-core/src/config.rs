//! Configuration module
//!
//! Settings for the storage backend, the metadata store, the indexing
//! backend and the upload allow-lists. Values come from the process
//! environment (with `.env` support); anything missing falls back to the
//! defaults below.

use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_INDEX_SERVICE_URL,
    DEFAULT_SEARCH_RESULT_LIMIT,
};
use crate::storage_types::StorageBackend;
use crate::validation::FileValidator;

const DB_MAX_CONNECTIONS: u32 = 5;
const INDEX_TIMEOUT_SECS: u64 = 30;

/// Upload service configuration
#[derive(Clone, Debug)]
pub struct UploadConfig {
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Metadata store configuration. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    // Indexing backend
    pub index_service_url: String,
    pub index_timeout_seconds: u64,
    pub search_result_limit: u32,
    // Selection validation
    pub allowed_content_types: Vec<String>,
    pub allowed_extensions: Vec<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<UploadConfig>);

impl Config {
    fn as_upload(&self) -> &UploadConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = UploadConfig::from_source(|key| env::var(key).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_upload().validate()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_upload().storage_backend
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_upload().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.as_upload().local_storage_base_url.as_deref()
    }

    pub fn database_url(&self) -> Option<&str> {
        self.as_upload().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_upload().db_max_connections
    }

    pub fn index_service_url(&self) -> &str {
        &self.as_upload().index_service_url
    }

    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.as_upload().index_timeout_seconds)
    }

    pub fn search_result_limit(&self) -> u32 {
        self.as_upload().search_result_limit
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.as_upload().allowed_content_types
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.as_upload().allowed_extensions
    }

    /// Validator built from the configured allow-lists.
    pub fn file_validator(&self) -> FileValidator {
        FileValidator::new(
            self.allowed_content_types().iter().cloned(),
            self.allowed_extensions().iter().cloned(),
        )
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl UploadConfig {
    /// Build the configuration from a key lookup. `Config::from_env` passes
    /// the process environment; tests pass a map.
    pub fn from_source<F>(get: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_backend = match get("STORAGE_BACKEND") {
            Some(raw) => raw.parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };

        let allowed_content_types = get("ALLOWED_CONTENT_TYPES")
            .map(|raw| split_list(&raw))
            .unwrap_or_else(|| {
                DEFAULT_ALLOWED_CONTENT_TYPES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        let allowed_extensions = get("ALLOWED_EXTENSIONS")
            .map(|raw| {
                split_list(&raw)
                    .into_iter()
                    .map(|ext| ext.trim_start_matches('.').to_string())
                    .collect()
            })
            .unwrap_or_else(|| {
                DEFAULT_ALLOWED_EXTENSIONS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        let config = UploadConfig {
            storage_backend,
            local_storage_path: get("LOCAL_STORAGE_PATH").filter(|s| !s.is_empty()),
            local_storage_base_url: get("LOCAL_STORAGE_BASE_URL").filter(|s| !s.is_empty()),
            database_url: get("DATABASE_URL").filter(|s| !s.is_empty()),
            db_max_connections: get("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DB_MAX_CONNECTIONS),
            index_service_url: get("INDEX_SERVICE_URL")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_INDEX_SERVICE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            index_timeout_seconds: get("INDEX_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(INDEX_TIMEOUT_SECS),
            search_result_limit: get("SEARCH_RESULT_LIMIT")
                .and_then(|s| s.parse().ok())
                .filter(|&k| k > 0)
                .unwrap_or(DEFAULT_SEARCH_RESULT_LIMIT),
            allowed_content_types,
            allowed_extensions,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_backend == StorageBackend::Local {
            if self.local_storage_path.is_none() {
                return Err(anyhow::anyhow!(
                    "LOCAL_STORAGE_PATH must be set when using local storage backend"
                ));
            }
            if self.local_storage_base_url.is_none() {
                return Err(anyhow::anyhow!(
                    "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                ));
            }
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if !self.index_service_url.starts_with("http://")
            && !self.index_service_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "INDEX_SERVICE_URL must be an http(s) URL"
            ));
        }

        if self.allowed_content_types.is_empty() && self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_CONTENT_TYPES and ALLOWED_EXTENSIONS cannot both be empty"
            ));
        }

        Ok(())
    }
}
