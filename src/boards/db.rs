use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use corkboard_common::{Board, UserArray, UserDoc};

use super::store::DocumentStore;

pub const USERS: &str = "Users";
pub const BOARDS: &str = "Boards";

/// Async-safe handle to the document database.
///
/// Wraps `DocumentDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<DocumentDb>>,
}

impl DbHandle {
    pub fn new(db: DocumentDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&DocumentDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the database mutex synchronously. For start-up, CLI one-shots
    /// and tests; never from a hot async path.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, DocumentDb>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }
}

/// Collection/id keyed JSON documents on SQLite.
pub struct DocumentDb {
    conn: Connection,
}

impl DocumentDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS documents (
                    collection TEXT NOT NULL,
                    id TEXT NOT NULL,
                    data TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (collection, id)
                );

                CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Raw documents ─────────────────────────────────────────────────

    fn read_data(conn: &Connection, collection: &str, id: &str) -> Result<Option<Value>> {
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query document")?;
        data.map(|d| serde_json::from_str(&d).context("Failed to parse document JSON"))
            .transpose()
    }

    fn write_data(conn: &Connection, collection: &str, id: &str, data: &Value) -> Result<()> {
        let json = serde_json::to_string(data).context("Failed to serialize document")?;
        conn.execute(
            "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)
             ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = datetime('now')",
            params![collection, id, json],
        )
        .context("Failed to upsert document")?;
        Ok(())
    }

    pub fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Self::read_data(&self.conn, collection, id)
    }

    /// Replace a document wholesale.
    pub fn set_document(&self, collection: &str, id: &str, data: &Value) -> Result<()> {
        Self::write_data(&self.conn, collection, id, data)
    }

    pub fn list_documents(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, data FROM documents WHERE collection = ?1 ORDER BY rowid")
            .context("Failed to prepare list_documents")?;
        let rows = stmt
            .query_map(params![collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .context("Failed to query documents")?;
        let mut documents = Vec::new();
        for row in rows {
            let (id, data) = row.context("Failed to read document row")?;
            let value = serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse {}/{}", collection, id))?;
            documents.push((id, value));
        }
        Ok(documents)
    }

    /// Atomically add `value` to the array `field` unless already present.
    /// Returns `false` when the document does not exist and was not created.
    pub fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: &str,
        create_if_missing: bool,
    ) -> Result<bool> {
        self.update_array(collection, id, field, create_if_missing, |items| {
            if !items.iter().any(|v| v.as_str() == Some(value)) {
                items.push(Value::String(value.to_string()));
            }
        })
    }

    /// Atomically remove every occurrence of `value` from the array `field`.
    /// Returns `false` when the document does not exist.
    pub fn array_remove(&self, collection: &str, id: &str, field: &str, value: &str) -> Result<bool> {
        self.update_array(collection, id, field, false, |items| {
            items.retain(|v| v.as_str() != Some(value));
        })
    }

    fn update_array<F>(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        create_if_missing: bool,
        edit: F,
    ) -> Result<bool>
    where
        F: FnOnce(&mut Vec<Value>),
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let mut doc = match Self::read_data(&tx, collection, id)? {
            Some(doc) => doc,
            None if create_if_missing => Value::Object(Default::default()),
            None => return Ok(false),
        };
        let obj = doc
            .as_object_mut()
            .with_context(|| format!("{}/{} is not a JSON object", collection, id))?;
        let slot = obj
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        let items = slot
            .as_array_mut()
            .with_context(|| format!("{}/{}.{} is not an array", collection, id, field))?;
        edit(items);
        Self::write_data(&tx, collection, id, &doc)?;
        tx.commit().context("Failed to commit array update")?;
        Ok(true)
    }

    // ── Typed access ──────────────────────────────────────────────────

    pub fn get_user(&self, user_id: &str) -> Result<Option<UserDoc>> {
        self.get_document(USERS, user_id)?
            .map(|doc| serde_json::from_value(doc).context("Failed to decode user document"))
            .transpose()
    }

    pub fn get_board(&self, board_id: &str) -> Result<Option<Board>> {
        self.get_document(BOARDS, board_id)?
            .map(|doc| serde_json::from_value(doc).context("Failed to decode board document"))
            .transpose()
    }

    pub fn put_board(&self, board: &Board) -> Result<()> {
        let doc = serde_json::to_value(board).context("Failed to encode board")?;
        self.set_document(BOARDS, &board.id, &doc)
    }

    pub fn list_boards(&self) -> Result<Vec<Board>> {
        self.list_documents(BOARDS)?
            .into_iter()
            .map(|(id, doc)| {
                serde_json::from_value(doc).with_context(|| format!("Failed to decode board {}", id))
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for DbHandle {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserDoc>> {
        let user_id = user_id.to_string();
        self.call(move |db| db.get_user(&user_id)).await
    }

    async fn get_board(&self, board_id: &str) -> Result<Option<Board>> {
        let board_id = board_id.to_string();
        self.call(move |db| db.get_board(&board_id)).await
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        self.call(|db| db.list_boards()).await
    }

    async fn put_board(&self, board: &Board) -> Result<()> {
        let board = board.clone();
        self.call(move |db| db.put_board(&board)).await
    }

    async fn add_to_user_array(
        &self,
        user_id: &str,
        field: UserArray,
        value: &str,
        create_if_missing: bool,
    ) -> Result<bool> {
        let (user_id, value) = (user_id.to_string(), value.to_string());
        self.call(move |db| {
            db.array_union(USERS, &user_id, field.field_name(), &value, create_if_missing)
        })
        .await
    }

    async fn remove_from_user_array(
        &self,
        user_id: &str,
        field: UserArray,
        value: &str,
    ) -> Result<bool> {
        let (user_id, value) = (user_id.to_string(), value.to_string());
        self.call(move |db| db.array_remove(USERS, &user_id, field.field_name(), &value))
            .await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use corkboard_common::Privacy;
    use serde_json::json;

    fn board(id: &str, owner: &str) -> Board {
        Board {
            id: id.to_string(),
            name: format!("Board {}", id),
            url_name: format!("board-{}", id),
            owner_id: owner.to_string(),
            privacy: Privacy::Private,
            members: vec![owner.to_string()],
            created_at: Utc::now(),
            background: None,
        }
    }

    #[test]
    fn test_create_database_and_run_migrations() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        let table_count: i32 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = 'documents'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(table_count, 1);
        Ok(())
    }

    #[test]
    fn test_put_and_get_board() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        let b = board("b1", "u1");
        db.put_board(&b)?;

        let fetched = db.get_board("b1")?.expect("board should exist");
        assert_eq!(fetched, b);
        assert!(db.get_board("missing")?.is_none());
        Ok(())
    }

    #[test]
    fn test_list_boards_in_insertion_order() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        db.put_board(&board("a", "u1"))?;
        db.put_board(&board("b", "u2"))?;
        let ids: Vec<String> = db.list_boards()?.into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        Ok(())
    }

    #[test]
    fn test_array_union_is_idempotent() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        assert!(db.array_union(USERS, "u1", "Boards", "b1", true)?);
        assert!(db.array_union(USERS, "u1", "Boards", "b1", true)?);
        assert!(db.array_union(USERS, "u1", "Boards", "b2", true)?);

        let user = db.get_user("u1")?.expect("user created");
        assert_eq!(user.boards, vec!["b1", "b2"]);
        assert!(user.pinned_boards.is_empty());
        Ok(())
    }

    #[test]
    fn test_array_union_without_create_skips_missing_user() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        assert!(!db.array_union(USERS, "ghost", "PinnedBoards", "b1", false)?);
        assert!(db.get_user("ghost")?.is_none());
        Ok(())
    }

    #[test]
    fn test_array_remove() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        db.set_document(USERS, "u1", &json!({"PinnedBoards": ["a", "b", "a"]}))?;
        assert!(db.array_remove(USERS, "u1", "PinnedBoards", "a")?);
        assert_eq!(db.get_user("u1")?.unwrap().pinned_boards, vec!["b"]);
        assert!(!db.array_remove(USERS, "nobody", "PinnedBoards", "a")?);
        Ok(())
    }

    #[test]
    fn test_array_ops_preserve_other_fields() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        db.set_document(USERS, "u1", &json!({"displayName": "Ada", "Boards": null}))?;
        db.array_union(USERS, "u1", "Boards", "b1", false)?;
        let doc = db.get_document(USERS, "u1")?.unwrap();
        assert_eq!(doc["displayName"], "Ada");
        assert_eq!(doc["Boards"], json!(["b1"]));
        Ok(())
    }

    #[test]
    fn test_array_op_rejects_non_array_field() -> Result<()> {
        let db = DocumentDb::new_in_memory()?;
        db.set_document(USERS, "u1", &json!({"Boards": "oops"}))?;
        assert!(db.array_union(USERS, "u1", "Boards", "b1", false).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_implements_document_store() -> Result<()> {
        let handle = DbHandle::new(DocumentDb::new_in_memory()?);
        let store: &dyn DocumentStore = &handle;

        store.put_board(&board("b1", "u1")).await?;
        assert!(store.add_to_user_array("u1", UserArray::Boards, "b1", true).await?);
        assert!(store.add_to_user_array("u1", UserArray::PinnedBoards, "b1", false).await?);

        let user = store.get_user("u1").await?.unwrap();
        assert!(user.is_pinned("b1"));
        assert!(store.remove_from_user_array("u1", UserArray::PinnedBoards, "b1").await?);
        assert!(!store.get_user("u1").await?.unwrap().is_pinned("b1"));
        assert_eq!(store.list_boards().await?.len(), 1);
        Ok(())
    }
}
