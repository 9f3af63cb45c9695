//! SQLite persistence for datasets, their rows and analytics events.
//!
//! Query functions take an explicit `&Connection`. A `rusqlite::Transaction`
//! derefs to one, so the same functions run inside or outside a transaction
//! and the caller decides the boundary.

pub mod analytics_events;
pub mod data_rows;
pub mod datasets;

use log::debug;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS datasets (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id       INTEGER NOT NULL,
    name         TEXT    NOT NULL CHECK (length(name) BETWEEN 1 AND 255),
    source_type  TEXT    NOT NULL DEFAULT 'csv',
    is_seed_data INTEGER NOT NULL DEFAULT 0,
    uploaded_by  INTEGER,
    created_at   TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_datasets_org ON datasets (org_id);

CREATE TABLE IF NOT EXISTS data_rows (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id          INTEGER NOT NULL,
    dataset_id      INTEGER NOT NULL REFERENCES datasets (id) ON DELETE CASCADE,
    source_type     TEXT    NOT NULL DEFAULT 'csv',
    category        TEXT    NOT NULL CHECK (length(category) BETWEEN 1 AND 255),
    parent_category TEXT    CHECK (parent_category IS NULL OR length(parent_category) <= 255),
    date            TEXT    NOT NULL,
    amount          TEXT    NOT NULL,
    label           TEXT    CHECK (label IS NULL OR length(label) <= 255),
    metadata        TEXT,
    created_at      TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_data_rows_org_date ON data_rows (org_id, date);
CREATE INDEX IF NOT EXISTS idx_data_rows_dataset ON data_rows (dataset_id);

CREATE TABLE IF NOT EXISTS analytics_events (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id     INTEGER NOT NULL,
    user_id    INTEGER NOT NULL,
    event_name TEXT    NOT NULL,
    metadata   TEXT,
    created_at TEXT    NOT NULL
);
"#;

/// Location of the SQLite file. Connections are opened per request.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Creates the schema if it does not exist yet.
    pub fn init(&self) -> rusqlite::Result<()> {
        let conn = self.connect()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("SQLite journal mode: {}", mode);
        conn.execute_batch(SCHEMA)
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Database;
    use tempfile::TempDir;

    /// A freshly initialised database in its own temporary directory. Keep the
    /// `TempDir` alive for as long as the database is used.
    pub fn temp_database() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("ingest.sqlite"));
        db.init().unwrap();
        (dir, db)
    }
}
