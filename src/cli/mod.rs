//! CLI layer for docvault.
//!
//! Provides the command-line interface using clap, with commands for
//! saving, retrieving, deleting and listing stored files.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
