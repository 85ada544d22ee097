//! Per-document operation locks.
//!
//! Operations on the same document id run one at a time, in the order they
//! acquired the lock. Entries are dropped once no operation holds or waits
//! on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard held for the duration of one operation on a document.
pub type KeyGuard = OwnedMutexGuard<()>;

/// Table of async mutexes keyed by document id.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl KeyLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let mutex = self.entry(key);
        mutex.lock_owned().await
    }

    /// Number of ids with a live lock entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Returns true when no id is locked or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut table = self.table();
        table.retain(|_, weak| weak.strong_count() > 0);

        if let Some(existing) = table.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        let mutex = Arc::new(AsyncMutex::new(()));
        table.insert(key.to_string(), Arc::downgrade(&mutex));
        mutex
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<String, Weak<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
