//! Core domain types for docvault.
//!
//! File content, lookup results, and content hashing. These are pure types
//! with no storage dependencies.

pub mod file;
pub mod hash;

pub use file::{FileContent, FileLookup, StoredFile};
pub use hash::{CONTENT_HASH_LEN, ContentHasher, content_hash};
