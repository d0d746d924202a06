//! Document store boundary.
//!
//! The store is the single source of truth for boards and for each user's
//! owned/pinned board ids. `DbHandle` (SQLite) is the production
//! implementation; `MemoryStore` backs tests and demos and can be told to
//! fail specific reads.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use corkboard_common::{Board, UserArray, UserDoc};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a user document; `None` if it does not exist.
    async fn get_user(&self, user_id: &str) -> Result<Option<UserDoc>>;

    /// Read a board document; `None` if it does not exist.
    async fn get_board(&self, board_id: &str) -> Result<Option<Board>>;

    async fn list_boards(&self) -> Result<Vec<Board>>;

    /// Create or replace a board document.
    async fn put_board(&self, board: &Board) -> Result<()>;

    /// Atomically add `value` to a user array field. Returns `false` when the
    /// user document is missing and `create_if_missing` is off.
    async fn add_to_user_array(
        &self,
        user_id: &str,
        field: UserArray,
        value: &str,
        create_if_missing: bool,
    ) -> Result<bool>;

    /// Atomically remove `value` from a user array field. Returns `false`
    /// when the user document is missing.
    async fn remove_from_user_array(
        &self,
        user_id: &str,
        field: UserArray,
        value: &str,
    ) -> Result<bool>;
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, UserDoc>,
    boards: Vec<Board>,
    failing_boards: HashSet<String>,
    failing_users: bool,
}

/// In-process document store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }

    pub fn insert_user(&self, user_id: &str, doc: UserDoc) -> Result<()> {
        self.state()?.users.insert(user_id.to_string(), doc);
        Ok(())
    }

    pub fn insert_board(&self, board: Board) -> Result<()> {
        let mut state = self.state()?;
        state.boards.retain(|b| b.id != board.id);
        state.boards.push(board);
        Ok(())
    }

    pub fn delete_board(&self, board_id: &str) -> Result<()> {
        self.state()?.boards.retain(|b| b.id != board_id);
        Ok(())
    }

    /// Make every read of `board_id` fail with a transport error.
    pub fn fail_board_reads(&self, board_id: &str) -> Result<()> {
        self.state()?.failing_boards.insert(board_id.to_string());
        Ok(())
    }

    /// Make every user-document read fail with a transport error.
    pub fn fail_user_reads(&self, fail: bool) -> Result<()> {
        self.state()?.failing_users = fail;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserDoc>> {
        let state = self.state()?;
        if state.failing_users {
            return Err(anyhow!("user store unavailable"));
        }
        Ok(state.users.get(user_id).cloned())
    }

    async fn get_board(&self, board_id: &str) -> Result<Option<Board>> {
        let state = self.state()?;
        if state.failing_boards.contains(board_id) {
            return Err(anyhow!("read of board {} timed out", board_id));
        }
        Ok(state.boards.iter().find(|b| b.id == board_id).cloned())
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        Ok(self.state()?.boards.clone())
    }

    async fn put_board(&self, board: &Board) -> Result<()> {
        self.insert_board(board.clone())
    }

    async fn add_to_user_array(
        &self,
        user_id: &str,
        field: UserArray,
        value: &str,
        create_if_missing: bool,
    ) -> Result<bool> {
        let mut state = self.state()?;
        if !create_if_missing && !state.users.contains_key(user_id) {
            return Ok(false);
        }
        let doc = state.users.entry(user_id.to_string()).or_default();
        let ids = doc.ids_mut(field);
        if !ids.iter().any(|id| id == value) {
            ids.push(value.to_string());
        }
        Ok(true)
    }

    async fn remove_from_user_array(
        &self,
        user_id: &str,
        field: UserArray,
        value: &str,
    ) -> Result<bool> {
        let mut state = self.state()?;
        match state.users.get_mut(user_id) {
            Some(doc) => {
                doc.ids_mut(field).retain(|id| id != value);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use corkboard_common::Privacy;

    fn board(id: &str) -> Board {
        Board {
            id: id.to_string(),
            name: id.to_string(),
            url_name: id.to_string(),
            owner_id: "u1".to_string(),
            privacy: Privacy::Public,
            members: vec!["u1".to_string()],
            created_at: Utc::now(),
            background: None,
        }
    }

    #[tokio::test]
    async fn test_memory_store_array_ops() -> Result<()> {
        let store = MemoryStore::new();
        assert!(!store.add_to_user_array("u1", UserArray::PinnedBoards, "a", false).await?);
        assert!(store.add_to_user_array("u1", UserArray::PinnedBoards, "a", true).await?);
        assert!(store.add_to_user_array("u1", UserArray::PinnedBoards, "a", true).await?);
        assert_eq!(store.get_user("u1").await?.unwrap().pinned_boards, vec!["a"]);

        assert!(store.remove_from_user_array("u1", UserArray::PinnedBoards, "a").await?);
        assert!(store.get_user("u1").await?.unwrap().pinned_boards.is_empty());
        assert!(!store.remove_from_user_array("u2", UserArray::Boards, "a").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_store_failure_injection() -> Result<()> {
        let store = MemoryStore::new();
        store.insert_board(board("a"))?;
        store.fail_board_reads("a")?;
        assert!(store.get_board("a").await.is_err());

        store.fail_user_reads(true)?;
        assert!(store.get_user("u1").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_store_replaces_board_by_id() -> Result<()> {
        let store = MemoryStore::new();
        store.insert_board(board("a"))?;
        let mut renamed = board("a");
        renamed.name = "Renamed".into();
        store.put_board(&renamed).await?;

        let boards = store.list_boards().await?;
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].name, "Renamed");

        store.delete_board("a")?;
        assert!(store.get_board("a").await?.is_none());
        Ok(())
    }
}
