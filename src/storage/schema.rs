//! Database schema definitions.
//!
//! Contains SQL schema and version bookkeeping for the docvault `SQLite`
//! database.

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// SQL schema for initial database setup.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- File content keyed by document id
CREATE TABLE IF NOT EXISTS files (
    document_id TEXT PRIMARY KEY NOT NULL,
    content BLOB NOT NULL,
    size INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
";

/// SQL to check if the files table exists.
pub const CHECK_SCHEMA_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name='files';
";

/// SQL to get schema version.
pub const GET_VERSION_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'version';
";

/// SQL to set schema version.
pub const SET_VERSION_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?);
";

/// SQL to insert or overwrite a file.
pub const UPSERT_FILE_SQL: &str = r"
INSERT INTO files (document_id, content, size, updated_at)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(document_id) DO UPDATE SET
    content = excluded.content,
    size = excluded.size,
    updated_at = excluded.updated_at
";

/// SQL to read file content.
pub const SELECT_FILE_SQL: &str = "SELECT content FROM files WHERE document_id = ?";

/// SQL to delete a file.
pub const DELETE_FILE_SQL: &str = "DELETE FROM files WHERE document_id = ?";

/// SQL to list every stored id.
pub const LIST_KEYS_SQL: &str = "SELECT document_id FROM files ORDER BY document_id";
