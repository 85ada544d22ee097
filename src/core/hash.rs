//! Content hashing.
//!
//! Derives a stable identifier from file bytes. The identifier is used for
//! deduplication, read-back verification, and as the foreign key carried by
//! mirrored metadata records.

use sha2::{Digest, Sha256};

/// Length of a content hash in hex characters.
pub const CONTENT_HASH_LEN: usize = 64;

/// Computes the SHA-256 digest of `bytes` as lowercase hex.
///
/// Total for every input, including the empty slice.
///
/// # Examples
///
/// ```
/// use docvault::core::content_hash;
///
/// let hash = content_hash(b"PDF");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, content_hash(b"PDF"));
/// ```
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = ContentHasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Incremental hasher for content arriving in pieces.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
}

impl ContentHasher {
    /// Creates an empty hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds more bytes into the digest.
    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Consumes the hasher and returns the lowercase hex digest.
    #[must_use]
    pub fn finalize(self) -> String {
        format!("{:x}", self.inner.finalize())
    }
}
