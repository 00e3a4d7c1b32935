//! SQLite-backed session store

use super::{resolve_index, resolve_range, SessionStore, StoreError, StoreResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQL schema for initialization
const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS kv_strings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS kv_lists (
    key TEXT NOT NULL,
    position INTEGER NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (key, position)
);

CREATE TABLE IF NOT EXISTS kv_hashes (
    key TEXT NOT NULL,
    field TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (key, field)
);
";

/// Thread-safe SQLite store handle
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn list_values(conn: &Connection, key: &str) -> StoreResult<Vec<String>> {
        let mut stmt =
            conn.prepare("SELECT value FROM kv_lists WHERE key = ?1 ORDER BY position ASC")?;
        let rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let values = Self::list_values(&conn, key)?;
        Ok(resolve_range(values.len(), start, stop)
            .map(|(from, to)| values[from..=to].to_vec())
            .unwrap_or_default())
    }

    async fn list_index(&self, key: &str, index: isize) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        let mut values = Self::list_values(&conn, key)?;
        Ok(resolve_index(values.len(), index).map(|i| values.swap_remove(i)))
    }

    async fn list_push_tail(&self, key: &str, value: &str) -> StoreResult<usize> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_lists (key, position, value)
             VALUES (?1, (SELECT COALESCE(MAX(position), 0) + 1 FROM kv_lists WHERE key = ?1), ?2)",
            params![key, value],
        )?;
        let len: i64 = conn.query_row(
            "SELECT COUNT(*) FROM kv_lists WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        usize::try_from(len).map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn list_pop_tail(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        let tail: Option<(i64, String)> = conn
            .query_row(
                "SELECT position, value FROM kv_lists WHERE key = ?1 ORDER BY position DESC LIMIT 1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((position, value)) = tail else {
            return Ok(None);
        };
        conn.execute(
            "DELETE FROM kv_lists WHERE key = ?1 AND position = ?2",
            params![key, position],
        )?;
        Ok(Some(value))
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT value FROM kv_hashes WHERE key = ?1 AND field = ?2",
                params![key, field],
                |row| row.get(0),
            )
            .optional()?)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_hashes (key, field, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
            params![key, field, value],
        )?;
        Ok(())
    }

    async fn hash_delete_field(&self, key: &str, field: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM kv_hashes WHERE key = ?1 AND field = ?2",
            params![key, field],
        )?;
        Ok(removed > 0)
    }

    async fn string_get(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT value FROM kv_strings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    async fn string_set(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_strings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        let mut removed = 0;
        for table in ["kv_strings", "kv_lists", "kv_hashes"] {
            removed += conn.execute(&format!("DELETE FROM {table} WHERE key = ?1"), params![key])?;
        }
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        for state in ["menu", "catalog", "item"] {
            store.list_push_tail("stack", state).await.unwrap();
        }

        assert_eq!(
            store.list_range("stack", -2, -1).await.unwrap(),
            vec!["catalog", "item"]
        );
        assert_eq!(store.list_index("stack", -1).await.unwrap().as_deref(), Some("item"));
        assert_eq!(store.list_pop_tail("stack").await.unwrap().as_deref(), Some("item"));

        // Positions keep growing after a pop
        assert_eq!(store.list_push_tail("stack", "search").await.unwrap(), 3);
        assert_eq!(
            store.list_range("stack", 0, -1).await.unwrap(),
            vec!["menu", "catalog", "search"]
        );
    }

    #[tokio::test]
    async fn test_hash_upsert_and_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.hash_set("data", "catalog", "{\"page\":1}").await.unwrap();
        store.hash_set("data", "catalog", "{\"page\":2}").await.unwrap();
        assert_eq!(
            store.hash_get("data", "catalog").await.unwrap().as_deref(),
            Some("{\"page\":2}")
        );
        assert!(store.hash_delete_field("data", "catalog").await.unwrap());
        assert_eq!(store.hash_get("data", "catalog").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_removes_any_kind() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.string_set("flag", "true").await.unwrap();
        store.list_push_tail("list", "a").await.unwrap();
        assert!(store.delete("flag").await.unwrap());
        assert!(store.delete("list").await.unwrap());
        assert!(!store.delete("missing").await.unwrap());
        assert_eq!(store.string_get("flag").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.list_push_tail("stack", "menu").await.unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list_index("stack", 0).await.unwrap().as_deref(), Some("menu"));
    }
}
