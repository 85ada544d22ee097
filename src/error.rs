//! Error types for docvault operations.
//!
//! This module provides the error hierarchy using `thiserror` for input
//! validation, storage, file I/O, and CLI commands.

use thiserror::Error;

/// Result type alias for docvault operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for docvault operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied data violates a precondition. Raised before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Storage-related errors (database open, write, commit).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),
}

impl Error {
    /// Returns true if this error was raised by input validation.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Returns true if this error came from the storage layer.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Precondition violations detected before any storage interaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInputError {
    /// Document identifier was empty.
    #[error("document id must not be empty")]
    EmptyDocumentId,

    /// File content had zero length.
    #[error("file content must not be empty")]
    EmptyContent,

    /// Content source is not a regular file.
    #[error("not a regular file: {path}")]
    NotAFile {
        /// Path that was supplied as content.
        path: String,
    },

    /// Content source could not be read.
    #[error("cannot read content from {path}: {reason}")]
    Unreadable {
        /// Path that was supplied as content.
        path: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Storage-specific errors for database operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The database could not be opened.
    #[error("failed to open database: {0}")]
    Open(String),

    /// Generic database query error.
    #[error("database error: {0}")]
    Database(String),

    /// The individual write statement failed.
    #[error("write failed: {0}")]
    Write(String),

    /// The enclosing transaction could not begin or commit.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// The transaction was rolled back instead of committed.
    #[error("transaction aborted: {0}")]
    Aborted(String),

    /// A storage operation exceeded its deadline.
    #[error("{operation} timed out after {millis}ms")]
    Timeout {
        /// Name of the operation that stalled.
        operation: &'static str,
        /// Deadline that expired, in milliseconds.
        millis: u64,
    },

    /// Schema creation or migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking storage worker panicked or was cancelled.
    #[error("storage worker failed: {0}")]
    Worker(String),

    /// The cached connection was closed underneath us.
    ///
    /// Handled inside the connection manager by reopening; callers only
    /// see it if a handle is closed mid-operation.
    #[error("connection closed")]
    ConnectionClosed,
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Requested document is not stored.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),
}

// Implement From traits for standard library errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err: Error = InvalidInputError::EmptyContent.into();
        assert_eq!(
            err.to_string(),
            "invalid input: file content must not be empty"
        );
        assert!(err.is_invalid_input());
        assert!(!err.is_storage());

        let err = InvalidInputError::NotAFile {
            path: "/tmp".to_string(),
        };
        assert_eq!(err.to_string(), "not a regular file: /tmp");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Timeout {
            operation: "open",
            millis: 250,
        };
        assert_eq!(err.to_string(), "open timed out after 250ms");

        let err = StorageError::Write("disk I/O error".to_string());
        assert!(err.to_string().starts_with("write failed"));

        let err = StorageError::Transaction("database is locked".to_string());
        assert!(err.to_string().starts_with("transaction error"));

        let err = StorageError::Aborted("rolled back".to_string());
        assert!(err.to_string().contains("aborted"));
    }

    #[test]
    fn test_write_and_transaction_failures_are_distinct() {
        let write = StorageError::Write("x".to_string());
        let tx = StorageError::Transaction("x".to_string());
        assert_ne!(write, tx);
    }

    #[test]
    fn test_io_error_variants() {
        let err = IoError::ReadFailed {
            path: "/tmp/test".to_string(),
            reason: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("/tmp/test"));
        assert!(err.to_string().contains("permission denied"));

        let err = IoError::MmapFailed {
            path: "/tmp/big".to_string(),
            reason: "out of memory".to_string(),
        };
        assert!(err.to_string().contains("memory mapping"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_rusqlite_error_to_error() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: Error = rusqlite_err.into();
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
    }

    #[test]
    fn test_command_error_variants() {
        let err = CommandError::NotFound("doc1".to_string());
        assert_eq!(err.to_string(), "document not found: doc1");

        let err = CommandError::ExecutionFailed("worker panicked".to_string());
        assert!(err.to_string().contains("execution failed"));
    }
}
