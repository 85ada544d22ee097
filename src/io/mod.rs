//! I/O utilities for docvault.
//!
//! Provides whole-file reading with memory mapping for large inputs, and
//! writing of retrieved content back to disk.

pub mod reader;

pub use reader::{FileReader, MAX_FILE_SIZE, read_file_bytes, write_file};
