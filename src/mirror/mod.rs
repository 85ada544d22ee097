//! Best-effort replication of file metadata to a remote backend.
//!
//! The mirror carries citation records (id, hash, name, type, size) and
//! never file content. It is independent of the file store: a failed mirror
//! call never affects a save, read or delete, and [`BestEffortMirror`] turns
//! every backend failure into a zero or empty result.

pub mod memory;

pub use memory::MemoryMirror;

use crate::core::content_hash;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Metadata describing one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    /// Document id the file is stored under.
    pub document_id: String,
    /// SHA-256 hex of the file content.
    pub content_hash: String,
    /// File name as known to the caller.
    pub file_name: String,
    /// MIME type as known to the caller.
    pub mime_type: String,
    /// Content size in bytes.
    pub size: u64,
    /// Owner key used to filter fetches.
    pub owner: String,
}

impl CitationRecord {
    /// Builds a record for `content`, deriving its hash and size.
    pub fn for_content(
        document_id: impl Into<String>,
        owner: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        content: &[u8],
    ) -> Self {
        Self {
            document_id: document_id.into(),
            content_hash: content_hash(content),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size: content.len() as u64,
            owner: owner.into(),
        }
    }

    /// Value of the named field, used as an upsert conflict key.
    #[must_use]
    pub fn key(&self, field: ConflictKey) -> &str {
        match field {
            ConflictKey::DocumentId => &self.document_id,
            ConflictKey::ContentHash => &self.content_hash,
        }
    }
}

/// Field that identifies a record for upserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKey {
    /// One record per document id.
    DocumentId,
    /// One record per distinct content.
    ContentHash,
}

/// Errors a mirror backend may report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// The backend could not be reached.
    #[error("mirror unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the request.
    #[error("mirror rejected request: {0}")]
    Rejected(String),
}

/// A remote backend holding citation records.
#[async_trait]
pub trait MirrorBackend: Send + Sync {
    /// Inserts or replaces records, matching existing ones on `conflict_key`.
    /// Returns the number of records written.
    async fn upsert(
        &self,
        records: &[CitationRecord],
        conflict_key: ConflictKey,
    ) -> Result<usize, MirrorError>;

    /// Returns every record owned by `owner`.
    async fn fetch_all(&self, owner: &str) -> Result<Vec<CitationRecord>, MirrorError>;
}

/// Wrapper that never lets a backend failure reach the caller.
#[derive(Debug, Clone)]
pub struct BestEffortMirror<B> {
    backend: B,
}

impl<B: MirrorBackend> BestEffortMirror<B> {
    /// Wraps `backend`.
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The wrapped backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Upserts records; returns 0 on any failure.
    pub async fn upsert(&self, records: &[CitationRecord], conflict_key: ConflictKey) -> usize {
        if records.is_empty() {
            return 0;
        }
        match self.backend.upsert(records, conflict_key).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, records = records.len(), "mirror upsert failed");
                0
            }
        }
    }

    /// Fetches records for `owner`; returns an empty list on any failure.
    pub async fn fetch_all(&self, owner: &str) -> Vec<CitationRecord> {
        match self.backend.fetch_all(owner).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, owner, "mirror fetch failed");
                Vec::new()
            }
        }
    }
}
