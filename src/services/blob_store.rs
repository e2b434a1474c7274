//! src/services/blob_store.rs
//!
//! BlobStore — flat-namespace blob storage backed by SQLite for metadata and
//! local disk for payload bytes. The gallery only ever writes, reads, and
//! lists blobs; there is no delete path, and re-uploading a name overwrites
//! the previous payload (last-writer-wins).

use crate::models::blob::Blob;
use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use uuid::Uuid;

const MAX_BLOB_NAME_LEN: usize = 255;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob `{0}` not found")]
    BlobNotFound(String),
    #[error("invalid blob name")]
    InvalidBlobName,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Apply the embedded schema. Idempotent; run once at startup (tests run it
/// against their in-memory pools).
pub async fn run_migrations(db: &SqlitePool) -> StoreResult<()> {
    let statements = SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    for stmt in statements {
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

/// BlobStore provides the three operations the gallery needs:
/// - Put a blob (writes bytes to disk and upserts the metadata row)
/// - Get a blob (reads the row from SQLite and the payload from disk)
/// - List all blobs (query SQLite)
#[derive(Clone)]
pub struct BlobStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where payloads are stored, one file per blob.
    pub base_path: PathBuf,
}

impl BlobStore {
    /// Create a new BlobStore backed by the provided SQLite pool and using
    /// `base_path` as the root directory for payloads.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Basic name validation to avoid trivial path traversal vectors.
    ///
    /// Upload filenames are sanitized before they get here; this is the second
    /// line of defense for names arriving from other callers.
    fn ensure_name_safe(&self, name: &str) -> StoreResult<()> {
        if name.is_empty() || name.len() > MAX_BLOB_NAME_LEN {
            return Err(StoreError::InvalidBlobName);
        }
        if name.contains('/') || name.contains("..") {
            return Err(StoreError::InvalidBlobName);
        }
        if name
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StoreError::InvalidBlobName);
        }
        Ok(())
    }

    /// Payload path for a blob. Flat namespace: one file per name, directly
    /// under `base_path`.
    fn blob_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Fetch a blob's metadata row, mapping a missing row to `BlobNotFound`.
    async fn fetch_blob(&self, name: &str) -> StoreResult<Blob> {
        sqlx::query_as::<_, Blob>(
            "SELECT id, name, content_type, size_bytes, etag, uploaded_at
             FROM blobs WHERE name = ?",
        )
        .bind(name)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::BlobNotFound(name.to_string()),
            other => StoreError::Sqlx(other),
        })
    }

    /// Write a blob and update metadata.
    ///
    /// - Writes bytes to a temporary file, flushes, and fsyncs.
    /// - Atomically renames into the final location.
    /// - Upserts the metadata row, so re-uploading a name overwrites.
    ///
    /// Cleans up the temp file on any failure.
    pub async fn put(
        &self,
        name: &str,
        content_type: Option<String>,
        data: Bytes,
    ) -> StoreResult<Blob> {
        self.ensure_name_safe(name)?;
        fs::create_dir_all(&self.base_path).await?;

        let file_path = self.blob_path(name);
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        if let Err(err) = file.write_all(&data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }

        let etag = format!("{:x}", md5::compute(&data));
        let insert_result = sqlx::query_as::<_, Blob>(
            r#"
            INSERT INTO blobs (id, name, content_type, size_bytes, etag, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                uploaded_at = excluded.uploaded_at
            RETURNING id, name, content_type, size_bytes, etag, uploaded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(content_type)
        .bind(data.len() as i64)
        .bind(&etag)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match insert_result {
            Ok(blob) => Ok(blob),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StoreError::Sqlx(err))
            }
        }
    }

    /// Fetch a blob's metadata and payload bytes.
    ///
    /// Returns `BlobNotFound` when either the row or the physical file is
    /// missing.
    pub async fn get(&self, name: &str) -> StoreResult<(Blob, Bytes)> {
        self.ensure_name_safe(name)?;
        let blob = self.fetch_blob(name).await?;

        let data = fs::read(self.blob_path(name)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::BlobNotFound(name.to_string())
            } else {
                StoreError::Io(err)
            }
        })?;

        Ok((blob, Bytes::from(data)))
    }

    /// List every blob, ordered by name. Ordering is an implementation detail,
    /// not part of the gallery contract.
    pub async fn list(&self) -> StoreResult<Vec<Blob>> {
        let blobs = sqlx::query_as::<_, Blob>(
            "SELECT id, name, content_type, size_bytes, etag, uploaded_at
             FROM blobs ORDER BY name ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(blobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;

    async fn store() -> (BlobStore, TempDir) {
        let db = Arc::new(
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .unwrap(),
        );
        run_migrations(&db).await.unwrap();
        let dir = TempDir::new().unwrap();
        (BlobStore::new(db, dir.path()), dir)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (store, _dir) = store().await;
        let written = store
            .put("a.png", Some("image/png".into()), Bytes::from_static(b"pix"))
            .await
            .unwrap();
        assert_eq!(written.size_bytes, 3);

        let (blob, data) = store.get("a.png").await.unwrap();
        assert_eq!(blob.name, "a.png");
        assert_eq!(blob.content_type.as_deref(), Some("image/png"));
        assert_eq!(&data[..], b"pix");
    }

    #[tokio::test]
    async fn put_same_name_overwrites() {
        let (store, _dir) = store().await;
        store
            .put("a.png", Some("image/png".into()), Bytes::from_static(b"one"))
            .await
            .unwrap();
        store
            .put("a.png", Some("image/png".into()), Bytes::from_static(b"second"))
            .await
            .unwrap();

        let (blob, data) = store.get("a.png").await.unwrap();
        assert_eq!(&data[..], b"second");
        assert_eq!(blob.size_bytes, 6);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_missing_blob_is_not_found() {
        let (store, _dir) = store().await;
        assert!(matches!(
            store.get("nope.png").await,
            Err(StoreError::BlobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_returns_all_blobs_by_name() {
        let (store, _dir) = store().await;
        store.put("b.jpg", None, Bytes::from_static(b"b")).await.unwrap();
        store.put("a.json", None, Bytes::from_static(b"{}")).await.unwrap();

        let names: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["a.json", "b.jpg"]);
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let (store, _dir) = store().await;
        for name in ["", "../escape.png", "a/b.png", "evil\\name.png"] {
            assert!(matches!(
                store.put(name, None, Bytes::from_static(b"x")).await,
                Err(StoreError::InvalidBlobName)
            ));
        }
    }
}
