//! Storage trait definition.
//!
//! Defines the interface for file storage backends so callers can hold a
//! store behind `dyn FileStorage`.

use crate::core::{FileContent, FileLookup};
use crate::error::Result;
use crate::storage::store::FileStore;
use async_trait::async_trait;

/// Trait for durable file storage backends.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Saves content under `document_id`, overwriting any previous content.
    ///
    /// Must not report success before the write is durable.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error for empty ids or content, and a
    /// storage error if the write or its commit fails.
    async fn save_file(&self, document_id: &str, content: FileContent) -> Result<()>;

    /// Reads the file under `document_id`, labelling it with the given name
    /// and MIME type.
    async fn get_file(&self, document_id: &str, file_name: &str, mime_type: &str) -> FileLookup;

    /// Deletes the file under `document_id`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    async fn delete_file(&self, document_id: &str) -> Result<()>;

    /// Lists stored ids. Diagnostic only; failures yield an empty list.
    async fn list_all_keys(&self) -> Vec<String>;
}

#[async_trait]
impl FileStorage for FileStore {
    async fn save_file(&self, document_id: &str, content: FileContent) -> Result<()> {
        Self::save_file(self, document_id, content).await
    }

    async fn get_file(&self, document_id: &str, file_name: &str, mime_type: &str) -> FileLookup {
        Self::get_file(self, document_id, file_name, mime_type).await
    }

    async fn delete_file(&self, document_id: &str) -> Result<()> {
        Self::delete_file(self, document_id).await
    }

    async fn list_all_keys(&self) -> Vec<String> {
        Self::list_all_keys(self).await
    }
}
