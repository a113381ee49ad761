//! PostgreSQL record store: CRUD for the user_images table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snapshelf_core::models::{ImageRecord, NewImageRecord};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use std::time::Duration;
use uuid::Uuid;

use crate::{ImageRecordStore, PersistenceError, PersistenceResult};

/// Row type for user_images table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct ImageRecordRow {
    pub id: Uuid,
    pub url: String,
    pub storage_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl ImageRecordRow {
    pub fn into_record(self) -> ImageRecord {
        ImageRecord {
            id: self.id.to_string(),
            url: self.url,
            storage_path: self.storage_path,
            file_name: self.file_name,
            file_size: u64::try_from(self.file_size).unwrap_or(0),
            file_type: self.file_type,
            uploaded_at: self.uploaded_at,
        }
    }
}

/// Repository for the user_images table.
#[derive(Clone)]
pub struct PgImageRecordStore {
    pool: PgPool,
}

impl PgImageRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and apply pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> PersistenceResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;

        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .map_err(|e| PersistenceError::Unavailable(format!("Migration failed: {}", e)))?;

        tracing::info!(max_connections, "Connected to metadata database");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl ImageRecordStore for PgImageRecordStore {
    #[tracing::instrument(skip(self, record), fields(db.table = "user_images", file_name = %record.file_name))]
    async fn create(&self, user_id: &str, record: NewImageRecord) -> PersistenceResult<String> {
        let file_size = i64::try_from(record.file_size).map_err(|_| {
            PersistenceError::Rejected(format!("File size {} out of range", record.file_size))
        })?;

        let id: Uuid = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            INSERT INTO user_images (user_id, url, storage_path, file_name, file_size, file_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&record.url)
        .bind(&record.storage_path)
        .bind(&record.file_name)
        .bind(file_size)
        .bind(&record.file_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(id.to_string())
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_images"))]
    async fn list(&self, user_id: &str) -> PersistenceResult<Vec<ImageRecord>> {
        let rows: Vec<ImageRecordRow> = sqlx::query_as::<Postgres, ImageRecordRow>(
            r#"
            SELECT id, url, storage_path, file_name, file_size, file_type, uploaded_at
            FROM user_images
            WHERE user_id = $1
            ORDER BY uploaded_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ImageRecordRow::into_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_converts_to_record() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let record = ImageRecordRow {
            id,
            url: "http://files/a.png".to_string(),
            storage_path: "user-images/u/u-1.png".to_string(),
            file_name: "a.png".to_string(),
            file_size: 2048,
            file_type: "image/png".to_string(),
            uploaded_at: now,
        }
        .into_record();

        assert_eq!(record.id, id.to_string());
        assert_eq!(record.file_size, 2048);
        assert_eq!(record.uploaded_at, now);
    }
}
