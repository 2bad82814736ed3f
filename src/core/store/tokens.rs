use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use super::EntryStore;
use super::types::ApiToken;
use crate::core::error::StoreError;

const TOKEN_COLUMNS: &str = "id, name, token_hash, is_active, created_at, last_used_at";

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<ApiToken> {
    Ok(ApiToken {
        id: row.get(0)?,
        name: row.get(1)?,
        token_hash: row.get(2)?,
        is_active: row.get(3)?,
        created_at: row.get(4)?,
        last_used_at: row.get(5)?,
    })
}

impl EntryStore {
    pub async fn insert_api_token(
        &self,
        name: &str,
        token_hash: &str,
    ) -> Result<ApiToken, StoreError> {
        let created_at = Utc::now();
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO api_tokens (name, token_hash, is_active, created_at) VALUES (?1, ?2, 1, ?3)",
            params![name, token_hash, created_at],
        )?;

        Ok(ApiToken {
            id: db.last_insert_rowid(),
            name: name.to_string(),
            token_hash: token_hash.to_string(),
            is_active: true,
            created_at,
            last_used_at: None,
        })
    }

    pub async fn token_by_hash(&self, token_hash: &str) -> Result<Option<ApiToken>, StoreError> {
        let db = self.db.lock().await;
        let token = db
            .query_row(
                &format!("SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE token_hash = ?1"),
                params![token_hash],
                token_from_row,
            )
            .optional()?;
        Ok(token)
    }

    pub async fn touch_token(&self, id: i64) -> Result<(), StoreError> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE api_tokens SET last_used_at = ?1 WHERE id = ?2",
            params![Utc::now(), id],
        )?;
        Ok(())
    }

    pub async fn list_api_tokens(&self) -> Result<Vec<ApiToken>, StoreError> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!("SELECT {TOKEN_COLUMNS} FROM api_tokens ORDER BY id"))?;
        let rows = stmt.query_map([], token_from_row)?;
        let mut tokens = Vec::new();
        for row in rows {
            tokens.push(row?);
        }
        Ok(tokens)
    }

    /// Permanently disables a token. Returns `false` if no active token had that id.
    pub async fn deactivate_api_token(&self, id: i64) -> Result<bool, StoreError> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE api_tokens SET is_active = 0 WHERE id = ?1 AND is_active = 1",
            params![id],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inserted_token_is_found_by_hash() {
        let store = EntryStore::open_in_memory().unwrap();
        let token = store.insert_api_token("importer", "abc123").await.unwrap();

        assert!(token.is_active);
        assert_eq!(token.last_used_at, None);
        let found = store.token_by_hash("abc123").await.unwrap();
        assert_eq!(found, Some(token));
        assert_eq!(store.token_by_hash("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_hash_is_rejected() {
        let store = EntryStore::open_in_memory().unwrap();
        store.insert_api_token("a", "same").await.unwrap();
        let err = store.insert_api_token("b", "same").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn touch_token_records_last_use() {
        let store = EntryStore::open_in_memory().unwrap();
        let token = store.insert_api_token("", "h").await.unwrap();

        store.touch_token(token.id).await.unwrap();
        let found = store.token_by_hash("h").await.unwrap().unwrap();
        assert!(found.last_used_at.is_some());
    }

    #[tokio::test]
    async fn deactivated_token_stays_inactive() {
        let store = EntryStore::open_in_memory().unwrap();
        let token = store.insert_api_token("", "h").await.unwrap();

        assert!(store.deactivate_api_token(token.id).await.unwrap());
        assert!(!store.deactivate_api_token(token.id).await.unwrap());

        let tokens = store.list_api_tokens().await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(!tokens[0].is_active);
    }
}
