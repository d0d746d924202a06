//! Toggle-on-write pin persistence.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use corkboard_common::UserArray;

use super::store::DocumentStore;
use crate::errors::{BoardError, BoardResult};

/// Persists one pin toggle and reports the state the server now holds.
#[async_trait]
pub trait PinPersistence: Send + Sync {
    async fn toggle_pin(&self, user_id: &str, board_id: &str) -> BoardResult<bool>;
}

/// Flip `board_id` in the user's pinned set and return the new state.
///
/// The stored set decides the outcome, not the caller: two concurrent
/// opposite-intent toggles both apply and cancel out.
pub async fn toggle_pin(
    store: &dyn DocumentStore,
    user_id: &str,
    board_id: &str,
) -> BoardResult<bool> {
    if user_id.trim().is_empty() {
        return Err(BoardError::Unauthenticated);
    }
    if board_id.trim().is_empty() {
        return Err(BoardError::BadRequest("boardId is required".to_string()));
    }

    let user = store
        .get_user(user_id)
        .await
        .map_err(BoardError::Transient)?
        .ok_or_else(|| BoardError::user_not_found(user_id))?;

    let changed = if user.is_pinned(board_id) {
        store
            .remove_from_user_array(user_id, UserArray::PinnedBoards, board_id)
            .await
            .map_err(BoardError::Transient)?
    } else {
        store
            .add_to_user_array(user_id, UserArray::PinnedBoards, board_id, false)
            .await
            .map_err(BoardError::Transient)?
    };
    // The document vanished between the read and the write.
    if !changed {
        return Err(BoardError::user_not_found(user_id));
    }

    let pinned = !user.is_pinned(board_id);
    info!(user_id, board_id, pinned, "Pin toggled");
    Ok(pinned)
}

/// [`PinPersistence`] that writes straight to a document store.
pub struct StorePinPersistence {
    store: Arc<dyn DocumentStore>,
}

impl StorePinPersistence {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PinPersistence for StorePinPersistence {
    async fn toggle_pin(&self, user_id: &str, board_id: &str) -> BoardResult<bool> {
        toggle_pin(self.store.as_ref(), user_id, board_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boards::fixtures::user_doc;
    use crate::boards::store::MemoryStore;
    use anyhow::Result;

    #[tokio::test]
    async fn test_toggle_adds_then_removes() -> Result<()> {
        let store = MemoryStore::new();
        store.insert_user("U1", user_doc(&["A"], &[]))?;

        assert!(toggle_pin(&store, "U1", "A").await?);
        assert_eq!(store.get_user("U1").await?.unwrap().pinned_boards, vec!["A"]);

        assert!(!toggle_pin(&store, "U1", "A").await?);
        assert!(store.get_user("U1").await?.unwrap().pinned_boards.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_leaves_other_pins_alone() -> Result<()> {
        let store = MemoryStore::new();
        store.insert_user("U1", user_doc(&[], &["B", "C"]))?;

        assert!(toggle_pin(&store, "U1", "A").await?);
        assert!(!toggle_pin(&store, "U1", "B").await?);
        assert_eq!(
            store.get_user("U1").await?.unwrap().pinned_boards,
            vec!["C", "A"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() -> Result<()> {
        let store = MemoryStore::new();
        let err = toggle_pin(&store, "ghost", "A").await.unwrap_err();
        assert!(matches!(err, BoardError::NotFound { .. }));
        assert!(store.get_user("ghost").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_is_transient() -> Result<()> {
        let store = MemoryStore::new();
        store.insert_user("U1", user_doc(&[], &[]))?;
        store.fail_user_reads(true)?;
        let err = toggle_pin(&store, "U1", "A").await.unwrap_err();
        assert!(err.is_transient());
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_missing_ids() {
        let store = MemoryStore::new();
        assert!(matches!(
            toggle_pin(&store, "", "A").await,
            Err(BoardError::Unauthenticated)
        ));
        assert!(matches!(
            toggle_pin(&store, "U1", " ").await,
            Err(BoardError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_store_persistence_delegates() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.insert_user("U1", user_doc(&[], &[]))?;
        let persistence = StorePinPersistence::new(store.clone());
        assert!(persistence.toggle_pin("U1", "A").await?);
        assert!(store.get_user("U1").await?.unwrap().is_pinned("A"));
        Ok(())
    }
}
