//! Storage layer for docvault.
//!
//! Provides durable file storage using `SQLite`. The connection manager owns
//! the database handle and its recovery; the file store builds save, read
//! and delete on top of it with commit-confirmed writes.

pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod locks;
pub mod schema;
pub mod store;
pub mod traits;

pub use config::{Location, StoreConfig};
pub use connection::{ConnectionManager, ConnectionStatus, Database};
pub use diagnostics::{StoreStats, Verification};
pub use locks::KeyLocks;
pub use schema::{CURRENT_SCHEMA_VERSION, SCHEMA_SQL};
pub use store::FileStore;
pub use traits::FileStorage;

/// Default database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".docvault/files.db";
