//! In-process mirror backend.

use super::{CitationRecord, ConflictKey, MirrorBackend, MirrorError};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Mirror backend holding records in memory.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    records: RwLock<Vec<CitationRecord>>,
}

impl MemoryMirror {
    /// Creates an empty mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true when no records are held.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MirrorBackend for MemoryMirror {
    async fn upsert(
        &self,
        records: &[CitationRecord],
        conflict_key: ConflictKey,
    ) -> Result<usize, MirrorError> {
        let mut stored = self.records.write().await;
        for record in records {
            let existing = stored
                .iter_mut()
                .find(|r| r.key(conflict_key) == record.key(conflict_key));
            match existing {
                Some(slot) => *slot = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(records.len())
    }

    async fn fetch_all(&self, owner: &str) -> Result<Vec<CitationRecord>, MirrorError> {
        let stored = self.records.read().await;
        Ok(stored.iter().filter(|r| r.owner == owner).cloned().collect())
    }
}
