mod entries;
mod tokens;
pub mod types;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::error::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    start_time TIMESTAMP NOT NULL,
    end_time TIMESTAMP,
    note TEXT NOT NULL DEFAULT '',
    active BOOLEAN NOT NULL DEFAULT 1,
    created_at TIMESTAMP NOT NULL,
    imported_at TIMESTAMP DEFAULT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_one_active_per_user
    ON entries(user_id) WHERE active = 1;

CREATE INDEX IF NOT EXISTS idx_entries_unimported
    ON entries(id) WHERE imported_at IS NULL;

CREATE TABLE IF NOT EXISTS api_tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL DEFAULT '',
    token_hash TEXT NOT NULL UNIQUE,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    created_at TIMESTAMP NOT NULL,
    last_used_at TIMESTAMP DEFAULT NULL
);
";

/// SQLite-backed store for tracking entries and API tokens.
///
/// A single connection sits behind an async mutex, so every call is
/// serialized. Compound operations additionally run inside one
/// `IMMEDIATE` transaction while the lock is held.
#[derive(Clone)]
pub struct EntryStore {
    db: Arc<Mutex<Connection>>,
}

impl EntryStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await?;
        }

        let db = Connection::open(path)?;
        info!("Opened entry store at {}", path.display());
        Self::init(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Runs arbitrary SQL against the live connection, e.g. to drop a table
    /// or install a failing trigger.
    #[cfg(test)]
    pub async fn execute_raw(&self, sql: &str) {
        self.db
            .lock()
            .await
            .execute_batch(sql)
            .expect("raw sql should apply");
    }

    fn init(db: Connection) -> Result<Self> {
        db.busy_timeout(Duration::from_secs(5))?;
        db.execute_batch(SCHEMA)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl StoreError {
    /// Maps a failed insert into `entries`: the partial unique index turns a
    /// racing second start into a constraint violation.
    fn from_entry_insert(err: rusqlite::Error) -> Self {
        if is_constraint_violation(&err) {
            StoreError::AlreadyActive
        } else {
            StoreError::Unavailable(err)
        }
    }
}
