//! Shared helpers for the `snapshelf` binary.

use anyhow::Context;
use snapshelf_core::models::{AuthenticatedUser, SourceFile};
use snapshelf_core::validation::{content_type_for_extension, trailing_extension};
use snapshelf_core::Config;
use snapshelf_db::{ImageRecordStore, MemoryRecordStore, PgImageRecordStore, RecordFeed};
use snapshelf_upload::UploadError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// The signed-in user, or the not-logged-in error.
pub fn require_user(uid: Option<&str>) -> Result<AuthenticatedUser, UploadError> {
    uid.map(str::trim)
        .filter(|uid| !uid.is_empty())
        .map(AuthenticatedUser::new)
        .ok_or(UploadError::NotAuthenticated)
}

/// Read a file from disk. The declared content type is derived from the
/// extension and is empty when the extension is unknown.
pub async fn read_source_file(path: &Path) -> anyhow::Result<SourceFile> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file path: {}", path.display()))?;
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = trailing_extension(&name)
        .map(content_type_for_extension)
        .unwrap_or_default();

    Ok(SourceFile::new(name, content_type, data))
}

/// The signed-in user and the files at `paths`. Nothing is read from disk
/// unless a user is signed in.
pub async fn read_selection(
    uid: Option<&str>,
    paths: &[PathBuf],
) -> anyhow::Result<(AuthenticatedUser, Vec<SourceFile>)> {
    let user = require_user(uid)?;

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(read_source_file(path).await?);
    }

    Ok((user, files))
}

/// PostgreSQL when `DATABASE_URL` is set, memory otherwise, wrapped in a
/// live feed.
pub async fn build_record_store(config: &Config) -> anyhow::Result<Arc<RecordFeed>> {
    let store: Arc<dyn ImageRecordStore> = match config.database_url() {
        Some(url) => Arc::new(
            PgImageRecordStore::connect(url, config.db_max_connections())
                .await
                .context("Failed to connect to the record database")?,
        ),
        None => {
            tracing::warn!("DATABASE_URL not set, records are kept in memory for this run only");
            Arc::new(MemoryRecordStore::new())
        }
    };

    Ok(Arc::new(RecordFeed::new(store)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_user_is_rejected() {
        assert_eq!(require_user(None), Err(UploadError::NotAuthenticated));
        assert_eq!(require_user(Some("  ")), Err(UploadError::NotAuthenticated));
        assert_eq!(require_user(Some("uid7")).unwrap().uid, "uid7");
    }

    #[tokio::test]
    async fn reads_name_bytes_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Beach.JPG");
        std::fs::write(&path, b"jpeg").unwrap();

        let file = read_source_file(&path).await.unwrap();
        assert_eq!(file.name, "Beach.JPG");
        assert_eq!(file.content_type, "image/jpeg");
        assert_eq!(file.data.as_ref(), b"jpeg");
    }

    #[tokio::test]
    async fn unknown_extension_has_empty_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();

        let file = read_source_file(&path).await.unwrap();
        assert_eq!(file.content_type, "");
    }

    #[tokio::test]
    async fn selection_checks_user_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![dir.path().join("gone.png")];

        let err = read_selection(None, &paths).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<UploadError>(),
            Some(&UploadError::NotAuthenticated)
        );

        let err = read_selection(Some("uid7"), &paths).await.unwrap_err();
        assert!(err.downcast_ref::<UploadError>().is_none());
    }

    #[tokio::test]
    async fn selection_reads_every_path() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.gif");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let (user, files) = read_selection(Some("uid7"), &[a, b]).await.unwrap();
        assert_eq!(user.uid, "uid7");
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.png", "b.gif"]);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_source_file(&dir.path().join("gone.png")).await.is_err());
    }
}
