//! File reading utilities with memory mapping support.
//!
//! Content saved from disk is materialized through [`FileReader`] before the
//! store asks for a connection, so no file I/O ever runs inside an open
//! transaction.

// Memory mapping requires unsafe but is well-documented and safe for read-only access
#![allow(unsafe_code)]

use crate::error::{IoError, Result};
use bytes::Bytes;
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Threshold for using memory mapping (1MB).
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Maximum file size to read into memory (1GB).
pub const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// File reader with support for memory mapping.
///
/// Automatically chooses the best reading strategy based on file size:
/// - Small files (< 1MB): Read directly into memory
/// - Large files (>= 1MB): Use memory mapping
///
/// # Examples
///
/// ```no_run
/// use docvault::io::FileReader;
///
/// let reader = FileReader::open("report.pdf").unwrap();
/// let content = reader.read_to_bytes().unwrap();
/// ```
pub struct FileReader {
    /// File handle.
    file: File,
    /// File size in bytes.
    size: u64,
    /// File path for error messages.
    path: String,
}

impl FileReader {
    /// Opens a regular file for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the path doesn't exist, is not a regular file,
    /// is larger than [`MAX_FILE_SIZE`], or can't be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();

        if !path_ref.exists() {
            return Err(IoError::FileNotFound { path: path_str }.into());
        }

        let file = File::open(path_ref).map_err(|e| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let metadata = file.metadata().map_err(|e| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        if !metadata.is_file() {
            return Err(IoError::ReadFailed {
                path: path_str,
                reason: "not a regular file".to_string(),
            }
            .into());
        }

        let size = metadata.len();

        if size > MAX_FILE_SIZE {
            return Err(IoError::ReadFailed {
                path: path_str,
                reason: format!("file too large: {size} bytes (max: {MAX_FILE_SIZE} bytes)"),
            }
            .into());
        }

        Ok(Self {
            file,
            size,
            path: path_str,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads the whole file.
    ///
    /// Large files are returned as a view over the memory map without
    /// copying; the map lives as long as the returned [`Bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub fn read_to_bytes(&self) -> Result<Bytes> {
        if self.size >= MMAP_THRESHOLD {
            self.map_bytes()
        } else {
            self.read_direct_bytes().map(Bytes::from)
        }
    }

    fn map_bytes(&self) -> Result<Bytes> {
        // Safety: the map is read-only and the file is not written by us
        let mmap = unsafe {
            Mmap::map(&self.file).map_err(|e| IoError::MmapFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?
        };

        Ok(Bytes::from_owner(mmap))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_direct_bytes(&self) -> Result<Vec<u8>> {
        let mut file = &self.file;
        let mut buffer = Vec::with_capacity(self.size as usize);
        file.read_to_end(&mut buffer)
            .map_err(|e| IoError::ReadFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(buffer)
    }
}

/// Reads a whole file into memory.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn read_file_bytes<P: AsRef<Path>>(path: P) -> Result<Bytes> {
    FileReader::open(path)?.read_to_bytes()
}

/// Writes bytes to a file, creating parent directories if needed.
///
/// # Errors
///
/// Returns an error if directory creation or file writing fails.
pub fn write_file<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path_ref = path.as_ref();
    let path_str = path_ref.to_string_lossy().to_string();

    if let Some(parent) = path_ref.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| IoError::DirectoryFailed {
            path: parent.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
    }

    std::fs::write(path_ref, content).map_err(|e| IoError::WriteFailed {
        path: path_str,
        reason: e.to_string(),
    })?;

    Ok(())
}
