//! Diagnostics for the file store.
//!
//! Nothing here affects the outcome of a save, read or delete. Failures are
//! logged and degrade to empty or negative results.

// SQLite stores all integers as i64. These casts are intentional and safe
// because we only store non-negative values.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::core::content_hash;
use crate::error::{Result, StorageError};
use crate::storage::connection::{ConnectionStatus, read_schema_version};
use crate::storage::schema::{LIST_KEYS_SQL, SELECT_FILE_SQL};
use crate::storage::store::FileStore;
use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, warn};

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of stored files.
    pub file_count: usize,
    /// Total size of stored content in bytes.
    pub total_bytes: u64,
    /// Schema version.
    pub schema_version: u32,
    /// Database file size in bytes (if applicable).
    pub db_size: Option<u64>,
    /// Connection lifecycle state after gathering stats.
    pub connection: ConnectionStatus,
    /// Number of times the database has been opened.
    pub opens: u64,
}

/// Result of reading a file back after it was saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Stored bytes hash to the expected value.
    Matched,
    /// Stored bytes differ from what was written.
    Mismatched {
        /// Hash of what was read back.
        actual: String,
    },
    /// Nothing is stored under the id.
    Missing,
    /// The read-back itself failed.
    Failed(StorageError),
}

impl FileStore {
    /// Lists every stored document id in ascending order.
    ///
    /// Any failure yields an empty list.
    pub async fn list_all_keys(&self) -> Vec<String> {
        let keys = self
            .run("list", |conn| {
                let mut stmt = conn.prepare(LIST_KEYS_SQL)?;
                let keys = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await;

        keys.unwrap_or_else(|e| {
            warn!(error = %e, "failed to list stored files");
            Vec::new()
        })
    }

    /// Gathers store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or queried.
    pub async fn stats(&self) -> Result<StoreStats> {
        let (file_count, total_bytes, schema_version): (i64, i64, Option<u32>) = self
            .run("stats", |conn| {
                let (count, bytes): (i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM files",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok((count, bytes, read_schema_version(conn)?))
            })
            .await?;

        let db_size = match self.config().path() {
            Some(path) => tokio::fs::metadata(path).await.ok().map(|m| m.len()),
            None => None,
        };

        Ok(StoreStats {
            file_count: file_count as usize,
            total_bytes: total_bytes as u64,
            schema_version: schema_version.unwrap_or(0),
            db_size,
            connection: self.connections().status(),
            opens: self.connections().open_count(),
        })
    }

    /// Reads a file back and compares its hash with `expected_hash`.
    ///
    /// Mismatches and failures are logged at `warn`; the caller's result is
    /// never changed by them.
    pub async fn verify_write(&self, document_id: &str, expected_hash: &str) -> Verification {
        let id = document_id.to_string();
        let stored = self
            .run("verify", move |conn| {
                let content: Option<Vec<u8>> = conn
                    .query_row(SELECT_FILE_SQL, params![id], |row| row.get(0))
                    .optional()?;
                Ok(content.map(|bytes| content_hash(&bytes)))
            })
            .await;

        let verification = match stored {
            Ok(Some(actual)) if actual == expected_hash => Verification::Matched,
            Ok(Some(actual)) => Verification::Mismatched { actual },
            Ok(None) => Verification::Missing,
            Err(e) => Verification::Failed(e),
        };

        match &verification {
            Verification::Matched => debug!(document_id, "write verified"),
            Verification::Mismatched { actual } => {
                warn!(document_id, expected = expected_hash, actual = %actual, "read-back hash mismatch");
            }
            Verification::Missing => warn!(document_id, "read-back found no file"),
            Verification::Failed(e) => warn!(document_id, error = %e, "read-back failed"),
        }

        verification
    }
}
