//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::cli::output::{
    OutputFormat, SavedFile, format_file, format_hash, format_keys, format_saved, format_status,
};
use crate::cli::parser::{Cli, Commands};
use crate::core::{FileContent, FileLookup, content_hash};
use crate::error::{CommandError, Result};
use crate::io::{read_file_bytes, write_file};
use crate::storage::FileStore;
use std::path::Path;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub async fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    // Opening is lazy; `hash` never touches the database.
    let store = FileStore::open(cli.store_config());
    let output = match &cli.command {
        Commands::Put { id, file } => cmd_put(&store, id, file, format).await,
        Commands::Get {
            id,
            name,
            mime_type,
            output,
        } => {
            cmd_get(
                &store,
                id,
                name.as_deref().unwrap_or(id),
                mime_type,
                output.as_deref(),
                format,
            )
            .await
        }
        Commands::Delete { id } => cmd_delete(&store, id, format).await,
        Commands::List => Ok(format_keys(&store.list_all_keys().await, format)),
        Commands::Status => store.stats().await.map(|stats| format_status(&stats, format)),
        Commands::Hash { file } => cmd_hash(file, format),
    };

    store.connections().shutdown();
    output
}

// ==================== Command Implementations ====================

async fn cmd_put(store: &FileStore, id: &str, file: &Path, format: OutputFormat) -> Result<String> {
    // Read once here so the reported hash matches what was stored.
    let content = tokio::task::spawn_blocking({
        let file = file.to_path_buf();
        move || read_file_bytes(file)
    })
    .await
    .map_err(|e| CommandError::ExecutionFailed(e.to_string()))??;

    let hash = content_hash(&content);
    let size = content.len();
    store.save_file(id, FileContent::Bytes(content)).await?;

    Ok(format_saved(
        &SavedFile {
            document_id: id,
            size,
            content_hash: &hash,
        },
        format,
    ))
}

async fn cmd_get(
    store: &FileStore,
    id: &str,
    name: &str,
    mime_type: &str,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let file = match store.get_file(id, name, mime_type).await {
        FileLookup::Found(file) => file,
        FileLookup::NotFound => return Err(CommandError::NotFound(id.to_string()).into()),
        FileLookup::ReadError(e) => return Err(e.into()),
    };

    let written_to = match output {
        Some(path) => {
            write_file(path, &file.content)?;
            Some(path.to_string_lossy().to_string())
        }
        None => None,
    };

    Ok(format_file(id, &file, written_to.as_deref(), format))
}

async fn cmd_delete(store: &FileStore, id: &str, format: OutputFormat) -> Result<String> {
    store.delete_file(id).await?;
    match format {
        OutputFormat::Text => Ok(format!("Deleted {id}\n")),
        OutputFormat::Json => Ok(format!("{}\n", serde_json::json!({ "deleted": id }))),
    }
}

fn cmd_hash(file: &Path, format: OutputFormat) -> Result<String> {
    let content = read_file_bytes(file)?;
    Ok(format_hash(
        &file.to_string_lossy(),
        &content_hash(&content),
        format,
    ))
}
