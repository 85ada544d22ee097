//! The file store.
//!
//! Persists file bytes keyed by document id on top of a
//! [`ConnectionManager`]. A save reports success only after both the write
//! statement and the enclosing transaction commit have succeeded.

// SQLite stores all integers as i64. These casts are intentional and safe
// because we only store non-negative sizes that fit in i64.
#![allow(clippy::cast_possible_wrap)]

use crate::core::{FileContent, FileLookup, StoredFile, content_hash};
use crate::error::{InvalidInputError, Result, StorageError};
use crate::io::read_file_bytes;
use crate::storage::config::StoreConfig;
use crate::storage::connection::{ConnectionManager, Database, run_blocking};
use crate::storage::locks::{KeyGuard, KeyLocks};
use crate::storage::schema::{DELETE_FILE_SQL, SELECT_FILE_SQL, UPSERT_FILE_SQL};
use bytes::Bytes;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

type StorageResult<T> = std::result::Result<T, StorageError>;

/// Durable file store backed by an embedded `SQLite` database.
///
/// The store never holds a connection of its own; each operation asks the
/// connection manager for one, so a closed or invalidated connection is
/// replaced transparently on the next call.
///
/// # Examples
///
/// ```no_run
/// use docvault::storage::{FileStore, StoreConfig};
///
/// # async fn demo() -> docvault::Result<()> {
/// let store = FileStore::open(StoreConfig::file(".docvault/files.db"));
/// store.save_file("doc1", vec![0x50, 0x44, 0x46]).await?;
/// let file = store.get_file("doc1", "a.pdf", "application/pdf").await;
/// assert!(file.is_found());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileStore {
    connections: Arc<ConnectionManager>,
    locks: KeyLocks,
}

impl FileStore {
    /// Creates a store. The database is opened lazily on first use.
    #[must_use]
    pub fn open(config: StoreConfig) -> Self {
        Self::with_manager(Arc::new(ConnectionManager::new(config)))
    }

    /// Creates a store on top of an existing connection manager.
    #[must_use]
    pub fn with_manager(connections: Arc<ConnectionManager>) -> Self {
        Self {
            connections,
            locks: KeyLocks::new(),
        }
    }

    /// The connection manager backing this store.
    #[must_use]
    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// The configuration this store was opened with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        self.connections.config()
    }

    /// Saves `content` under `document_id`, replacing any previous content.
    ///
    /// Content is fully materialized before a connection is requested. Empty
    /// content is rejected without opening the database.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError`] for an empty id, empty content, or an
    /// unreadable path. Returns [`StorageError::Write`] if the write
    /// statement fails, [`StorageError::Transaction`] if the transaction
    /// cannot begin, [`StorageError::Aborted`] if the commit fails, and
    /// [`StorageError::Timeout`] if the transaction exceeds its deadline.
    /// A timed-out save may still commit afterwards, but always before any
    /// later operation on the same id runs.
    pub async fn save_file(
        &self,
        document_id: &str,
        content: impl Into<FileContent> + Send,
    ) -> Result<()> {
        validate_document_id(document_id)?;

        let bytes = materialize(content.into()).await?;
        if bytes.is_empty() {
            return Err(InvalidInputError::EmptyContent.into());
        }

        let guard = Arc::new(self.locks.lock(document_id).await);

        let id = document_id.to_string();
        let payload = bytes.clone();
        self.run_locked("save", &guard, move |conn| {
            write_in_transaction(conn, &id, &payload)
        })
        .await?;

        debug!(document_id, size = bytes.len(), "file saved");

        if self.config().verify_writes {
            self.verify_write(document_id, &content_hash(&bytes)).await;
        }

        Ok(())
    }

    /// Reads the file stored under `document_id`.
    ///
    /// `file_name` and `mime_type` are attached to the returned handle as
    /// given; they are not read from storage.
    pub async fn get_file(&self, document_id: &str, file_name: &str, mime_type: &str) -> FileLookup {
        if document_id.is_empty() {
            return FileLookup::NotFound;
        }

        let guard = Arc::new(self.locks.lock(document_id).await);

        let id = document_id.to_string();
        match self
            .run_locked("get", &guard, move |conn| read_content(conn, &id))
            .await
        {
            Ok(Some(content)) => {
                FileLookup::Found(StoredFile::new(file_name, mime_type, content))
            }
            Ok(None) => FileLookup::NotFound,
            Err(e) => {
                warn!(document_id, error = %e, "failed to read file");
                FileLookup::ReadError(e)
            }
        }
    }

    /// Deletes the file stored under `document_id`.
    ///
    /// Deleting an id that was never stored succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::EmptyDocumentId`] for an empty id and a
    /// [`StorageError`] if the delete cannot be committed.
    pub async fn delete_file(&self, document_id: &str) -> Result<()> {
        validate_document_id(document_id)?;

        let guard = Arc::new(self.locks.lock(document_id).await);

        let id = document_id.to_string();
        let removed = self
            .run_locked("delete", &guard, move |conn| delete_in_transaction(conn, &id))
            .await?;
        debug!(document_id, removed, "file deleted");

        Ok(())
    }

    /// Runs `work` against a fresh-or-cached connection under the
    /// transaction deadline.
    ///
    /// A handle found closed when the work starts is retried once on a
    /// reopened handle; nothing has touched the database at that point.
    pub(crate) async fn run<T, F>(&self, operation: &'static str, work: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: Fn(&mut Connection) -> StorageResult<T> + Send + Sync + 'static,
    {
        self.run_with(operation, None, work).await
    }

    /// Like [`FileStore::run`], but the blocking worker also holds `guard`.
    ///
    /// A worker that outlives its deadline keeps the document locked until
    /// it really finishes, so a later operation on the same id cannot be
    /// overtaken by an abandoned one.
    async fn run_locked<T, F>(
        &self,
        operation: &'static str,
        guard: &Arc<KeyGuard>,
        work: F,
    ) -> StorageResult<T>
    where
        T: Send + 'static,
        F: Fn(&mut Connection) -> StorageResult<T> + Send + Sync + 'static,
    {
        self.run_with(operation, Some(guard), work).await
    }

    async fn run_with<T, F>(
        &self,
        operation: &'static str,
        guard: Option<&Arc<KeyGuard>>,
        work: F,
    ) -> StorageResult<T>
    where
        T: Send + 'static,
        F: Fn(&mut Connection) -> StorageResult<T> + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let deadline = self.config().transaction_timeout;

        let db = self.connections.acquire().await?;
        let attempt = run_on(
            operation,
            deadline,
            Arc::clone(&db),
            guard.map(Arc::clone),
            Arc::clone(&work),
        );
        match attempt.await {
            Err(StorageError::ConnectionClosed) => {
                debug!(operation, generation = db.generation(), "connection closed, retrying");
                let db = self.connections.acquire().await?;
                run_on(operation, deadline, db, guard.map(Arc::clone), work).await
            }
            other => other,
        }
    }
}

async fn run_on<T, F>(
    operation: &'static str,
    deadline: Duration,
    db: Arc<Database>,
    held: Option<Arc<KeyGuard>>,
    work: Arc<F>,
) -> StorageResult<T>
where
    T: Send + 'static,
    F: Fn(&mut Connection) -> StorageResult<T> + Send + Sync + 'static,
{
    run_blocking(operation, deadline, move || {
        let result = db.with_conn(|conn| (*work)(conn));
        drop(held);
        result
    })
    .await
}

fn validate_document_id(document_id: &str) -> Result<()> {
    if document_id.is_empty() {
        return Err(InvalidInputError::EmptyDocumentId.into());
    }
    Ok(())
}

/// Reads content fully into memory.
async fn materialize(content: FileContent) -> Result<Bytes> {
    let path = match content {
        FileContent::Bytes(bytes) => return Ok(bytes),
        FileContent::Path(path) => path,
    };
    let display = path.display().to_string();

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| InvalidInputError::Unreadable {
            path: display.clone(),
            reason: e.to_string(),
        })?;
    if !metadata.is_file() {
        return Err(InvalidInputError::NotAFile { path: display }.into());
    }

    tokio::task::spawn_blocking(move || read_file_bytes(&path))
        .await
        .map_err(|e| InvalidInputError::Unreadable {
            path: display.clone(),
            reason: e.to_string(),
        })?
        .map_err(|e| {
            InvalidInputError::Unreadable {
                path: display,
                reason: e.to_string(),
            }
            .into()
        })
}

/// Writes one file in its own transaction.
///
/// The statement result is the write acknowledgement and `commit` the
/// commit acknowledgement; both must succeed. The write lock is taken at
/// `BEGIN`, so lock contention surfaces as [`StorageError::Transaction`].
fn write_in_transaction(conn: &mut Connection, document_id: &str, content: &[u8]) -> StorageResult<()> {
    let tx = begin_immediate(conn)?;

    let written = tx
        .execute(
            UPSERT_FILE_SQL,
            params![document_id, content, content.len() as i64, now()],
        )
        .map_err(|e| StorageError::Write(e.to_string()))?;
    if written != 1 {
        return Err(StorageError::Write(format!(
            "expected one row written, got {written}"
        )));
    }

    // A failed commit leaves the transaction to roll back on drop.
    tx.commit()
        .map_err(|e| StorageError::Aborted(e.to_string()))
}

fn begin_immediate(conn: &mut Connection) -> StorageResult<rusqlite::Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| StorageError::Transaction(e.to_string()))
}

fn read_content(conn: &mut Connection, document_id: &str) -> StorageResult<Option<Bytes>> {
    let content: Option<Vec<u8>> = conn
        .query_row(SELECT_FILE_SQL, params![document_id], |row| row.get(0))
        .optional()?;
    Ok(content.map(Bytes::from))
}

fn delete_in_transaction(conn: &mut Connection, document_id: &str) -> StorageResult<usize> {
    let tx = begin_immediate(conn)?;
    let removed = tx
        .execute(DELETE_FILE_SQL, params![document_id])
        .map_err(|e| StorageError::Write(e.to_string()))?;
    tx.commit()
        .map_err(|e| StorageError::Aborted(e.to_string()))?;
    Ok(removed)
}

/// Returns current Unix timestamp.
#[allow(clippy::cast_possible_wrap)]
fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::storage::ConnectionStatus;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::file(temp_dir.path().join("files.db")).with_verify_writes(true);
        (FileStore::open(config), temp_dir)
    }

    #[tokio::test]
    async fn test_pdf_round_trip() {
        let (store, _temp) = create_test_store();

        store.save_file("doc1", vec![0x50, 0x44, 0x46]).await.unwrap();

        let file = store
            .get_file("doc1", "a.pdf", "application/pdf")
            .await
            .into_option()
            .unwrap();
        assert_eq!(&file.content[..], &[0x50, 0x44, 0x46]);
        assert_eq!(file.name, "a.pdf");
        assert_eq!(file.mime_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_absent() {
        let (store, _temp) = create_test_store();

        store.save_file("doc1", vec![0x50, 0x44, 0x46]).await.unwrap();
        store.delete_file("doc1").await.unwrap();

        let lookup = store.get_file("doc1", "a.pdf", "application/pdf").await;
        assert_eq!(lookup, FileLookup::NotFound);
    }

    #[tokio::test]
    async fn test_empty_content_rejected_without_opening() {
        let (store, _temp) = create_test_store();

        let err = store.save_file("doc1", Vec::new()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidInput(InvalidInputError::EmptyContent)
        ));
        assert_eq!(store.connections().open_count(), 0);
        assert_eq!(store.connections().status(), ConnectionStatus::Absent);
    }

    #[tokio::test]
    async fn test_empty_id_rejected() {
        let (store, _temp) = create_test_store();

        let err = store.save_file("", vec![1]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidInput(InvalidInputError::EmptyDocumentId)
        ));
        assert!(store.delete_file("").await.is_err());
        assert_eq!(store.get_file("", "a", "b").await, FileLookup::NotFound);
        assert_eq!(store.connections().open_count(), 0);
    }

    #[tokio::test]
    async fn test_save_from_path() {
        let (store, temp) = create_test_store();
        let source = temp.path().join("report.pdf");
        std::fs::write(&source, b"%PDF-1.7").unwrap();

        store
            .save_file("report", FileContent::from_path(&source))
            .await
            .unwrap();

        let file = store
            .get_file("report", "report.pdf", "application/pdf")
            .await
            .into_option()
            .unwrap();
        assert_eq!(&file.content[..], b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_save_from_directory_rejected() {
        let (store, temp) = create_test_store();

        let err = store
            .save_file("dir", FileContent::from_path(temp.path()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidInput(InvalidInputError::NotAFile { .. })
        ));
        assert_eq!(store.connections().open_count(), 0);
    }

    #[tokio::test]
    async fn test_save_from_missing_path_rejected() {
        let (store, temp) = create_test_store();

        let err = store
            .save_file("missing", FileContent::from_path(temp.path().join("nope.bin")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidInput(InvalidInputError::Unreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_file_on_disk_rejected() {
        let (store, temp) = create_test_store();
        let source = temp.path().join("empty.bin");
        std::fs::write(&source, b"").unwrap();

        let err = store
            .save_file("empty", FileContent::from_path(&source))
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(store.connections().open_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_handle_mid_use_is_retried() {
        let (store, _temp) = create_test_store();
        store.save_file("doc1", vec![1, 2, 3]).await.unwrap();

        let db = store.connections().acquire().await.unwrap();
        db.close();

        store.save_file("doc2", vec![4, 5]).await.unwrap();
        assert!(store.get_file("doc1", "a", "b").await.is_found());
        assert!(store.get_file("doc2", "a", "b").await.is_found());
    }

    #[tokio::test]
    async fn test_write_timeout_reported() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("files.db");
        let config = StoreConfig::file(&db_path)
            .with_transaction_timeout(Duration::from_millis(50))
            .with_busy_timeout(Duration::from_millis(1500))
            .with_verify_writes(false);
        let store = FileStore::open(config);
        store.save_file("doc1", vec![1]).await.unwrap();

        let blocker = Connection::open(&db_path).unwrap();
        blocker.execute_batch("BEGIN EXCLUSIVE;").unwrap();

        let err = store.save_file("doc1", vec![2]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::Timeout {
                operation: "save",
                ..
            })
        ));

        blocker.execute_batch("ROLLBACK;").unwrap();
    }

    #[tokio::test]
    async fn test_timed_out_save_never_overtakes_later_save() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("files.db");
        let config = StoreConfig::file(&db_path)
            .with_open_timeout(Duration::from_millis(100))
            .with_transaction_timeout(Duration::from_millis(100))
            .with_busy_timeout(Duration::from_secs(5))
            .with_verify_writes(false);
        let store = FileStore::open(config);
        store.save_file("doc1", vec![1]).await.unwrap();

        let blocker = Connection::open(&db_path).unwrap();
        blocker.execute_batch("BEGIN EXCLUSIVE;").unwrap();

        let err = store.save_file("doc1", vec![2]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::Timeout { .. })
        ));

        let release = tokio::task::spawn_blocking(move || {
            std::thread::sleep(Duration::from_millis(300));
            blocker.execute_batch("ROLLBACK;").unwrap();
        });

        store.save_file("doc1", vec![3]).await.unwrap();
        release.await.unwrap();

        let file = store.get_file("doc1", "a", "b").await.into_option().unwrap();
        assert_eq!(&file.content[..], &[3]);
    }

    fn contended_store(db_path: &std::path::Path) -> FileStore {
        let config = StoreConfig::file(db_path)
            .with_busy_timeout(Duration::from_millis(50))
            .with_verify_writes(false);
        FileStore::open(config)
    }

    #[tokio::test]
    async fn test_locked_database_fails_at_begin() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("files.db");
        let store = contended_store(&db_path);
        store.save_file("doc1", vec![1]).await.unwrap();

        let blocker = Connection::open(&db_path).unwrap();
        blocker.execute_batch("BEGIN EXCLUSIVE;").unwrap();

        let err = store.save_file("doc1", vec![2]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::Transaction(_))
        ));

        let err = store.delete_file("doc1").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::Transaction(_))
        ));

        blocker.execute_batch("ROLLBACK;").unwrap();
        let file = store.get_file("doc1", "a", "b").await.into_option().unwrap();
        assert_eq!(&file.content[..], &[1]);
    }

    #[tokio::test]
    async fn test_rejected_statement_is_write_error() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("files.db");
        let store = contended_store(&db_path);
        store.save_file("doc1", vec![1]).await.unwrap();

        Connection::open(&db_path)
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_inserts BEFORE INSERT ON files
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let err = store.save_file("doc2", vec![2]).await.unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Write(_))));
        assert!(store.get_file("doc2", "a", "b").await.is_not_found());
    }

    #[tokio::test]
    async fn test_failed_commit_is_aborted_and_rolled_back() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("files.db");
        let store = contended_store(&db_path);
        store.save_file("doc1", vec![1]).await.unwrap();

        // The dangling reference is only checked at COMMIT.
        Connection::open(&db_path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE owners (id INTEGER PRIMARY KEY);
                 CREATE TABLE claims (
                     owner INTEGER REFERENCES owners(id) DEFERRABLE INITIALLY DEFERRED
                 );
                 CREATE TRIGGER claim_on_insert AFTER INSERT ON files
                 BEGIN INSERT INTO claims VALUES (42); END;",
            )
            .unwrap();

        let err = store.save_file("doc2", vec![2]).await.unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Aborted(_))));
        assert!(store.get_file("doc2", "a", "b").await.is_not_found());
        assert!(store.get_file("doc1", "a", "b").await.is_found());
    }

    #[tokio::test]
    async fn test_unreadable_database_reports_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("files.db");
        std::fs::write(&db_path, vec![0x42; 4096]).unwrap();
        let store = FileStore::open(StoreConfig::file(&db_path));

        let lookup = store.get_file("doc1", "a.pdf", "application/pdf").await;
        assert!(matches!(lookup, FileLookup::ReadError(StorageError::Open(_))));

        let err = store.delete_file("doc1").await.unwrap_err();
        assert!(err.is_storage());
    }
}
