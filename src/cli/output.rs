//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::core::StoredFile;
use crate::error::Error;
use crate::storage::StoreStats;
use serde::Serialize;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Summary of a saved file.
#[derive(Debug, Clone, Serialize)]
pub struct SavedFile<'a> {
    /// Document id.
    pub document_id: &'a str,
    /// Content size in bytes.
    pub size: usize,
    /// SHA-256 hex digest of the content.
    pub content_hash: &'a str,
}

/// Formats the result of a save.
#[must_use]
pub fn format_saved(saved: &SavedFile<'_>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "Saved {} ({}, sha256 {})\n",
            saved.document_id,
            format_size(saved.size),
            saved.content_hash
        ),
        OutputFormat::Json => format_json(saved),
    }
}

/// Formats a retrieved file.
///
/// `written_to` is the path the content was written to, if any.
#[must_use]
pub fn format_file(
    document_id: &str,
    file: &StoredFile,
    written_to: Option<&str>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "File: {document_id}");
            let _ = writeln!(output, "  Name:      {}", file.name);
            let _ = writeln!(output, "  Type:      {}", file.mime_type);
            let _ = writeln!(output, "  Size:      {}", format_size(file.size()));
            let _ = writeln!(output, "  SHA-256:   {}", file.content_hash());
            if let Some(path) = written_to {
                let _ = writeln!(output, "  Written:   {path}");
            }
            output
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "document_id": document_id,
                "name": file.name,
                "mime_type": file.mime_type,
                "size": file.size(),
                "content_hash": file.content_hash(),
                "written_to": written_to,
            });
            format_json(&value)
        }
    }
}

/// Formats the list of stored ids.
#[must_use]
pub fn format_keys(keys: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if keys.is_empty() {
                return "No files stored.\n".to_string();
            }
            let mut output = String::new();
            for key in keys {
                let _ = writeln!(output, "{key}");
            }
            output
        }
        OutputFormat::Json => format_json(&keys),
    }
}

/// Formats a status response.
#[must_use]
pub fn format_status(stats: &StoreStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(stats),
        OutputFormat::Json => format_json(stats),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn format_status_text(stats: &StoreStats) -> String {
    let mut output = String::new();
    output.push_str("docvault status\n");
    output.push_str("===============\n\n");
    let _ = writeln!(output, "  Files:         {}", stats.file_count);
    let _ = writeln!(
        output,
        "  Content size:  {}",
        format_size(stats.total_bytes as usize)
    );
    let _ = writeln!(output, "  Schema:        v{}", stats.schema_version);
    let _ = writeln!(output, "  Connection:    {}", stats.connection);
    if let Some(size) = stats.db_size {
        let _ = writeln!(output, "  DB size:       {size} bytes");
    }
    output
}

/// Formats a content hash.
#[must_use]
pub fn format_hash(path: &str, hash: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{hash}  {path}\n"),
        OutputFormat::Json => format_json(&serde_json::json!({ "path": path, "sha256": hash })),
    }
}

/// Formats an error for display.
#[must_use]
pub fn format_error(err: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => err.to_string(),
        OutputFormat::Json => {
            let kind = match err {
                Error::InvalidInput(_) => "invalid_input",
                Error::Storage(_) => "storage",
                Error::Io(_) => "io",
                Error::Command(_) => "command",
            };
            serde_json::to_string(&serde_json::json!({
                "error": kind,
                "message": err.to_string(),
            }))
            .unwrap_or_else(|_| "{}".to_string())
        }
    }
}

fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    let mut out = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    out.push('\n');
    out
}

/// Formats a byte size as human-readable.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
