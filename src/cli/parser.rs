//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use crate::storage::StoreConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// docvault: durable local file store.
///
/// Saves, retrieves and deletes document binaries in an embedded `SQLite`
/// database.
#[derive(Parser, Debug)]
#[command(name = "docvault")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the docvault database file.
    ///
    /// Defaults to `.docvault/files.db` in the current directory.
    #[arg(short, long, env = "DOCVAULT_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Deadline for opening the database, in milliseconds.
    #[arg(long, env = "DOCVAULT_OPEN_TIMEOUT_MS", default_value = "5000", global = true)]
    pub open_timeout_ms: u64,

    /// Deadline for each transaction, in milliseconds.
    #[arg(
        long,
        env = "DOCVAULT_TRANSACTION_TIMEOUT_MS",
        default_value = "10000",
        global = true
    )]
    pub transaction_timeout_ms: u64,

    /// Read every saved file back and log mismatches.
    #[arg(long, env = "DOCVAULT_VERIFY_WRITES", global = true)]
    pub verify_writes: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save a file under a document id.
    Put {
        /// Document id.
        id: String,

        /// Path to the file to store.
        file: PathBuf,
    },

    /// Retrieve a stored file.
    Get {
        /// Document id.
        id: String,

        /// File name to attach (defaults to the id).
        #[arg(short, long)]
        name: Option<String>,

        /// MIME type to attach.
        #[arg(short, long, default_value = "application/octet-stream")]
        mime_type: String,

        /// Write the content to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a stored file.
    #[command(name = "delete", alias = "rm")]
    Delete {
        /// Document id.
        id: String,
    },

    /// List stored document ids.
    #[command(name = "list", alias = "ls")]
    List,

    /// Show store status.
    Status,

    /// Print the SHA-256 content hash of a file.
    Hash {
        /// Path to the file.
        file: PathBuf,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }

    /// Builds the store configuration from the parsed flags.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::file(self.get_db_path())
            .with_open_timeout(Duration::from_millis(self.open_timeout_ms))
            .with_transaction_timeout(Duration::from_millis(self.transaction_timeout_ms))
            .with_verify_writes(self.verify_writes)
    }
}
