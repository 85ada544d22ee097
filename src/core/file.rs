//! File content and lookup types.
//!
//! The store persists bytes only. File name and MIME type are supplied by the
//! caller when a file is read back and are attached to the returned
//! [`StoredFile`] without touching storage.

use crate::error::StorageError;
use bytes::Bytes;
use serde::Serialize;
use std::path::PathBuf;

/// Content handed to the store for saving.
///
/// Path sources are read fully before any connection or transaction is
/// requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Bytes already held in memory.
    Bytes(Bytes),
    /// A file on disk to be read in full.
    Path(PathBuf),
}

impl FileContent {
    /// Creates content from a filesystem path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }
}

impl From<Bytes> for FileContent {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for FileContent {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(bytes))
    }
}

impl<const N: usize> From<&'static [u8; N]> for FileContent {
    fn from(bytes: &'static [u8; N]) -> Self {
        Self::Bytes(Bytes::from_static(bytes))
    }
}

/// A file read back from the store.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use docvault::core::StoredFile;
///
/// let file = StoredFile::new("a.pdf", "application/pdf", Bytes::from_static(b"PDF"));
/// assert_eq!(file.size(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Caller-supplied file name.
    pub name: String,
    /// Caller-supplied MIME type.
    pub mime_type: String,
    /// Stored bytes.
    #[serde(skip)]
    pub content: Bytes,
}

impl StoredFile {
    /// Builds a file handle from raw bytes and caller metadata.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Bytes) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content,
        }
    }

    /// Returns the content length in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Returns the SHA-256 content hash.
    #[must_use]
    pub fn content_hash(&self) -> String {
        super::hash::content_hash(&self.content)
    }
}

/// Outcome of reading a file.
///
/// Keeps "never stored" apart from "could not be read".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLookup {
    /// The file exists and was read.
    Found(StoredFile),
    /// No file is stored under the id.
    NotFound,
    /// The read failed.
    ReadError(StorageError),
}

impl FileLookup {
    /// Returns true for [`FileLookup::Found`].
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns true for [`FileLookup::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Collapses to the found file, treating read errors as absence.
    #[must_use]
    pub fn into_option(self) -> Option<StoredFile> {
        match self {
            Self::Found(file) => Some(file),
            Self::NotFound | Self::ReadError(_) => None,
        }
    }

    /// Converts into a `Result`, surfacing read errors.
    pub fn into_result(self) -> std::result::Result<Option<StoredFile>, StorageError> {
        match self {
            Self::Found(file) => Ok(Some(file)),
            Self::NotFound => Ok(None),
            Self::ReadError(err) => Err(err),
        }
    }
}
