//! Store configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default deadline for opening or validating a connection.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for a single read or write transaction.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default `SQLite` busy timeout.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A database file. Parent directories are created on open.
    File(PathBuf),
    /// A named in-memory database shared by every connection of one store.
    Memory(String),
}

/// Configuration for a [`FileStore`](super::FileStore).
///
/// # Examples
///
/// ```
/// use docvault::storage::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::file(".docvault/files.db")
///     .with_open_timeout(Duration::from_secs(1))
///     .with_verify_writes(true);
/// assert!(config.verify_writes);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database location.
    pub location: Location,
    /// Deadline for opening and validating a connection.
    pub open_timeout: Duration,
    /// Deadline for each transaction.
    pub transaction_timeout: Duration,
    /// How long `SQLite` waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Read back every save after commit and log mismatches.
    pub verify_writes: bool,
}

impl StoreConfig {
    /// Configuration for a database file.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::with_location(Location::File(path.as_ref().to_path_buf()))
    }

    /// Configuration for a named in-memory database.
    pub fn memory(name: impl Into<String>) -> Self {
        Self::with_location(Location::Memory(name.into()))
    }

    fn with_location(location: Location) -> Self {
        Self {
            location,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            verify_writes: cfg!(debug_assertions),
        }
    }

    /// Sets the open/validation deadline.
    #[must_use]
    pub const fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Sets the per-transaction deadline.
    #[must_use]
    pub const fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    /// Sets the `SQLite` busy timeout.
    #[must_use]
    pub const fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enables or disables post-commit read-back verification.
    #[must_use]
    pub const fn with_verify_writes(mut self, verify: bool) -> Self {
        self.verify_writes = verify;
        self
    }

    /// Returns the database file path, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory(_) => None,
        }
    }
}
