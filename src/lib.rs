//! # docvault
//!
//! Durable local file store.
//!
//! docvault persists document binaries keyed by a document id in an
//! embedded `SQLite` database. A save only reports success once the
//! transaction holding the write has committed, so an acknowledged file
//! survives a process restart.
//!
//! ## Features
//!
//! - **Commit-confirmed writes**: `save_file` resolves after `COMMIT`
//! - **Self-healing connections**: a closed or schema-less handle is
//!   discarded and reopened on the next operation
//! - **Content hashing**: SHA-256 hex digests for integrity checks
//! - **Remote mirror seam**: best-effort citation record sync
//!
//! ## Example
//!
//! ```no_run
//! use docvault::{FileLookup, FileStore, StoreConfig};
//!
//! # async fn run() -> docvault::Result<()> {
//! let store = FileStore::open(StoreConfig::file("files.db"));
//! store.save_file("doc1", b"%PDF-1.7".to_vec()).await?;
//!
//! if let FileLookup::Found(file) = store.get_file("doc1", "a.pdf", "application/pdf").await {
//!     assert_eq!(file.size(), 8);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]

pub mod cli;
pub mod core;
pub mod error;
pub mod io;
pub mod mirror;
pub mod storage;

// Re-export commonly used types at crate root
pub use error::{Error, InvalidInputError, Result, StorageError};

// Re-export core domain types
pub use core::{ContentHasher, FileContent, FileLookup, StoredFile, content_hash};

// Re-export storage types
pub use storage::{
    ConnectionManager, DEFAULT_DB_PATH, FileStorage, FileStore, StoreConfig, StoreStats,
};

// Re-export mirror types
pub use mirror::{BestEffortMirror, CitationRecord, ConflictKey, MemoryMirror, MirrorBackend};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
