//! Represents a stored blob (image or metadata sidecar).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata row for a single stored blob. The payload bytes live on disk;
/// this struct carries everything else.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Blob {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Blob name — the sanitized upload filename, unique in the flat namespace.
    pub name: String,

    /// Content type (MIME type) supplied at upload time.
    pub content_type: Option<String>,

    /// Payload size in bytes.
    pub size_bytes: i64,

    /// MD5 checksum of the payload.
    pub etag: Option<String>,

    /// Timestamp of the most recent write under this name.
    pub uploaded_at: DateTime<Utc>,
}

impl Blob {
    /// Whether this blob is a metadata sidecar rather than an image.
    pub fn is_sidecar(&self) -> bool {
        self.name.ends_with(".json")
    }
}
