//! Connection lifecycle management.
//!
//! A [`ConnectionManager`] owns the single lazily-opened [`Database`] handle
//! used by a store. Every operation asks the manager for a handle; the
//! manager validates any cached handle, discards it when it has been closed
//! or has lost its schema, and opens a fresh one when needed.
//!
//! Opening is single-flight: callers arriving while an open is in progress
//! wait for it and share the resulting handle.

use crate::error::StorageError;
use crate::storage::config::{Location, StoreConfig};
use crate::storage::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL,
};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

type StorageResult<T> = std::result::Result<T, StorageError>;

/// Runs blocking storage work on the blocking pool under a deadline.
///
/// A worker that outlives its deadline keeps running in the background but
/// its result is discarded.
pub(crate) async fn run_blocking<T, F>(
    operation: &'static str,
    deadline: Duration,
    work: F,
) -> StorageResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StorageResult<T> + Send + 'static,
{
    match tokio::time::timeout(deadline, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(StorageError::from(join_err)),
        Err(_) => Err(StorageError::Timeout {
            operation,
            millis: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An open handle to the embedded database.
///
/// The handle can be closed underneath its users (by [`Database::close`] or
/// [`ConnectionManager::shutdown`]); later operations on it fail with
/// [`StorageError::ConnectionClosed`] and the manager replaces it on the next
/// acquisition.
pub struct Database {
    conn: Mutex<Option<Connection>>,
    generation: u64,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("generation", &self.generation)
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Database {
    /// Opens the database described by `config`, creating the schema when
    /// the files table does not exist yet.
    fn open(config: &StoreConfig, generation: u64) -> StorageResult<Self> {
        let (conn, path) = match &config.location {
            Location::File(path) => (open_file(path)?, Some(path.clone())),
            Location::Memory(name) => (open_memory(name)?, None),
        };

        conn.busy_timeout(config.busy_timeout)
            .map_err(|e| StorageError::Open(e.to_string()))?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(|e| StorageError::Open(e.to_string()))?;

        ensure_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            generation,
            path,
        })
    }

    /// Sequence number of the open that produced this handle.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Database file path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns true once the handle has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock(&self.conn).is_none()
    }

    /// Closes the underlying connection.
    ///
    /// Models the host environment closing the database. Idempotent.
    pub fn close(&self) {
        let Some(conn) = lock(&self.conn).take() else {
            return;
        };
        if let Err((_, e)) = conn.close() {
            warn!(generation = self.generation, error = %e, "error while closing database");
        }
        debug!(generation = self.generation, "database handle closed");
    }

    /// Runs `f` with exclusive access to the connection.
    ///
    /// Blocking; call from a blocking worker.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut guard = lock(&self.conn);
        let conn = guard.as_mut().ok_or(StorageError::ConnectionClosed)?;
        f(conn)
    }

    /// Checks that the handle is open and the files table still exists.
    fn validate(&self) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))?;
            Ok(count > 0)
        })
    }

    /// Reads the recorded schema version.
    pub fn schema_version(&self) -> StorageResult<Option<u32>> {
        self.with_conn(|conn| read_schema_version(conn))
    }
}

fn open_file(path: &Path) -> StorageResult<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::Open(e.to_string()))?;
    }

    let conn = Connection::open(path).map_err(|e| StorageError::Open(e.to_string()))?;

    // Use WAL mode for better concurrent access (returns result, use query_row)
    let _: String = conn
        .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
        .map_err(|e| StorageError::Open(e.to_string()))?;

    Ok(conn)
}

fn open_memory(name: &str) -> StorageResult<Connection> {
    let uri = format!("file:{name}?mode=memory&cache=shared");
    Connection::open_with_flags(uri, OpenFlags::default())
        .map_err(|e| StorageError::Open(e.to_string()))
}

pub(crate) fn read_schema_version(conn: &Connection) -> StorageResult<Option<u32>> {
    let has_info: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_info'",
        [],
        |row| row.get(0),
    )?;
    if has_info == 0 {
        return Ok(None);
    }
    let version: Option<String> = conn
        .query_row(GET_VERSION_SQL, [], |row| row.get(0))
        .optional()?;
    Ok(version.and_then(|v| v.parse().ok()))
}

fn ensure_schema(conn: &Connection) -> StorageResult<()> {
    let is_init: i64 = conn
        .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
        .map_err(|e| StorageError::Open(e.to_string()))?;

    if is_init == 0 {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        conn.execute(SET_VERSION_SQL, params![CURRENT_SCHEMA_VERSION.to_string()])
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        info!(version = CURRENT_SCHEMA_VERSION, "created file store schema");
    }

    Ok(())
}

/// Observable lifecycle state of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No handle cached.
    Absent,
    /// An open is in flight.
    Opening,
    /// A handle is cached and was valid when last checked.
    Open,
    /// The cached handle was discarded; the next acquisition reopens.
    Invalidated,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Invalidated => "invalidated",
        };
        f.write_str(s)
    }
}

enum ConnectionState {
    Absent,
    Opening,
    Open(Arc<Database>),
    Invalidated,
}

impl ConnectionState {
    const fn status(&self) -> ConnectionStatus {
        match self {
            Self::Absent => ConnectionStatus::Absent,
            Self::Opening => ConnectionStatus::Opening,
            Self::Open(_) => ConnectionStatus::Open,
            Self::Invalidated => ConnectionStatus::Invalidated,
        }
    }
}

/// Owner of the store's single database connection.
///
/// # Examples
///
/// ```no_run
/// use docvault::storage::{ConnectionManager, StoreConfig};
///
/// # async fn demo() -> Result<(), docvault::StorageError> {
/// let manager = ConnectionManager::new(StoreConfig::file("files.db"));
/// let db = manager.acquire().await?;
/// assert!(!db.is_closed());
/// # Ok(())
/// # }
/// ```
pub struct ConnectionManager {
    config: StoreConfig,
    state: Mutex<ConnectionState>,
    open_lock: tokio::sync::Mutex<()>,
    /// Holds a named in-memory database alive between reopens.
    keepalive: Arc<Mutex<Option<Connection>>>,
    opens: AtomicU64,
}

impl ConnectionManager {
    /// Creates a manager. Nothing is opened until the first acquisition.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ConnectionState::Absent),
            open_lock: tokio::sync::Mutex::new(()),
            keepalive: Arc::new(Mutex::new(None)),
            opens: AtomicU64::new(0),
        }
    }

    /// Configuration this manager opens with.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        lock(&self.state).status()
    }

    /// Number of times a database handle has been opened.
    #[must_use]
    pub fn open_count(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Returns a ready handle, reusing the cached one when it is still valid.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`], [`StorageError::Migration`] or
    /// [`StorageError::Timeout`] if a fresh open fails. Stale handles are
    /// replaced silently.
    pub async fn acquire(&self) -> StorageResult<Arc<Database>> {
        if let Some(db) = self.reuse_cached().await {
            return Ok(db);
        }

        let _open_guard = self.open_lock.lock().await;

        // Another caller may have finished opening while we waited.
        if let Some(db) = self.reuse_cached().await {
            return Ok(db);
        }

        self.open_fresh().await
    }

    /// Drops the cached handle so the next acquisition reopens.
    pub fn invalidate(&self) {
        let mut state = lock(&self.state);
        if matches!(*state, ConnectionState::Open(_)) {
            *state = ConnectionState::Invalidated;
        }
    }

    /// Closes the cached handle and releases any in-memory keepalive.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *lock(&self.state), ConnectionState::Absent);
        if let ConnectionState::Open(db) = previous {
            db.close();
        }
        lock(&*self.keepalive).take();
    }

    async fn reuse_cached(&self) -> Option<Arc<Database>> {
        let cached = match &*lock(&self.state) {
            ConnectionState::Open(db) => Arc::clone(db),
            _ => return None,
        };

        let probe = Arc::clone(&cached);
        let outcome = run_blocking("validate", self.config.open_timeout, move || {
            probe.validate()
        })
        .await;

        match outcome {
            Ok(true) => Some(cached),
            Ok(false) => {
                debug!(generation = cached.generation(), "files table missing, reopening");
                self.discard(&cached);
                None
            }
            Err(e) => {
                debug!(generation = cached.generation(), error = %e, "stale connection, reopening");
                self.discard(&cached);
                None
            }
        }
    }

    fn discard(&self, stale: &Arc<Database>) {
        let mut state = lock(&self.state);
        if let ConnectionState::Open(current) = &*state
            && Arc::ptr_eq(current, stale)
        {
            *state = ConnectionState::Invalidated;
        }
    }

    async fn open_fresh(&self) -> StorageResult<Arc<Database>> {
        *lock(&self.state) = ConnectionState::Opening;

        let generation = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        let config = self.config.clone();
        let keepalive = Arc::clone(&self.keepalive);

        let opened = run_blocking("open", self.config.open_timeout, move || {
            if let Location::Memory(name) = &config.location {
                let mut anchor = lock(&*keepalive);
                if anchor.is_none() {
                    *anchor = Some(open_memory(name)?);
                }
            }
            Database::open(&config, generation)
        })
        .await;

        match opened {
            Ok(db) => {
                let db = Arc::new(db);
                debug!(generation, "database opened");
                *lock(&self.state) = ConnectionState::Open(Arc::clone(&db));
                Ok(db)
            }
            Err(e) => {
                warn!(generation, error = %e, "failed to open database");
                *lock(&self.state) = ConnectionState::Absent;
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("location", &self.config.location)
            .field("status", &self.status())
            .field("opens", &self.open_count())
            .finish_non_exhaustive()
    }
}
