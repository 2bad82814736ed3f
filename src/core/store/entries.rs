use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::debug;

use super::EntryStore;
#[cfg(test)]
use super::types::EntryCheck;
use super::types::{Entry, ImportOutcome, UserId};
use crate::core::error::StoreError;

const ENTRY_COLUMNS: &str = "id, user_id, start_time, end_time, note, active, imported_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        user_id: UserId::new(row.get::<_, String>(1)?),
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        note: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        active: row.get(5)?,
        imported_at: row.get(6)?,
    })
}

/// The user's active entry, if any.
fn select_active(conn: &Connection, user_id: &UserId) -> rusqlite::Result<Option<Entry>> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE user_id = ?1 AND active = 1 LIMIT 1"),
        params![user_id.as_str()],
        entry_from_row,
    )
    .optional()
}

/// `None` when the entry does not exist, otherwise whether it is unimported.
fn select_unimported(conn: &Connection, id: i64) -> rusqlite::Result<Option<bool>> {
    conn.query_row(
        "SELECT imported_at IS NULL FROM entries WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
}

impl EntryStore {
    /// Starts a new active entry for `user_id`.
    ///
    /// Fails with [`StoreError::AlreadyActive`] if the user already has one;
    /// in that case no row is written.
    pub async fn create_entry(&self, user_id: &UserId, note: &str) -> Result<Entry, StoreError> {
        let mut db = self.db.lock().await;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let active: i64 = tx.query_row(
            "SELECT COUNT(*) FROM entries WHERE user_id = ?1 AND active = 1",
            params![user_id.as_str()],
            |row| row.get(0),
        )?;
        if active > 0 {
            return Err(StoreError::AlreadyActive);
        }

        let start_time = Utc::now();
        tx.execute(
            "INSERT INTO entries (user_id, start_time, note, active, created_at)
             VALUES (?1, ?2, ?3, 1, ?2)",
            params![user_id.as_str(), start_time, note],
        )
        .map_err(StoreError::from_entry_insert)?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(entry_id = id, user_id = %user_id, "Entry created");
        Ok(Entry {
            id,
            user_id: user_id.clone(),
            start_time,
            end_time: None,
            note: note.to_string(),
            active: true,
            imported_at: None,
        })
    }

    /// Stops the user's active entry and returns the updated snapshot.
    pub async fn stop_entry(&self, user_id: &UserId) -> Result<Entry, StoreError> {
        let mut db = self.db.lock().await;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let entry = select_active(&tx, user_id)?.ok_or(StoreError::NoActiveEntry)?;

        let end_time = Utc::now();
        tx.execute(
            "UPDATE entries SET end_time = ?1, active = 0 WHERE id = ?2 AND active = 1",
            params![end_time, entry.id],
        )?;
        tx.commit()?;

        debug!(entry_id = entry.id, user_id = %user_id, "Entry stopped");
        Ok(Entry {
            end_time: Some(end_time),
            active: false,
            ..entry
        })
    }

    #[cfg(test)]
    pub async fn active_entry(&self, user_id: &UserId) -> Result<Option<Entry>, StoreError> {
        let db = self.db.lock().await;
        Ok(select_active(&db, user_id)?)
    }

    /// All entries not yet pulled by the import consumer, in insertion order.
    pub async fn list_unimported(&self) -> Result<Vec<Entry>, StoreError> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE imported_at IS NULL ORDER BY id"
        ))?;
        let rows = stmt.query_map([], entry_from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub async fn count_unimported(&self) -> Result<usize, StoreError> {
        let db = self.db.lock().await;
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM entries WHERE imported_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[cfg(test)]
    pub async fn check_entry(&self, id: i64) -> Result<EntryCheck, StoreError> {
        let db = self.db.lock().await;
        let unimported = select_unimported(&db, id)?;
        Ok(EntryCheck {
            exists: unimported.is_some(),
            unimported: unimported.unwrap_or(false),
        })
    }

    /// Stamps `imported_at`. Returns `false` when the entry is missing or
    /// already imported; an existing timestamp is never overwritten.
    #[cfg(test)]
    pub async fn mark_imported(&self, id: i64) -> Result<bool, StoreError> {
        let db = self.db.lock().await;
        let changed = db.execute(
            "UPDATE entries SET imported_at = ?1 WHERE id = ?2 AND imported_at IS NULL",
            params![Utc::now(), id],
        )?;
        Ok(changed > 0)
    }

    /// Check-then-mark for a single entry, executed as one transaction.
    pub async fn import_entry(&self, id: i64) -> Result<ImportOutcome, StoreError> {
        let mut db = self.db.lock().await;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let outcome = match select_unimported(&tx, id)? {
            None => ImportOutcome::NotFound,
            Some(false) => ImportOutcome::AlreadyImported,
            Some(true) => {
                tx.execute(
                    "UPDATE entries SET imported_at = ?1 WHERE id = ?2 AND imported_at IS NULL",
                    params![Utc::now(), id],
                )?;
                ImportOutcome::Imported
            }
        };
        tx.commit()?;
        Ok(outcome)
    }
}
