//! Shared test data for the board modules.

use std::sync::Arc;

use anyhow::Result;
use chrono::DateTime;

use corkboard_common::{Board, Privacy, UserDoc};

use super::search::{MemoryIndex, SearchIndex};
use super::store::MemoryStore;

pub fn board(id: &str, owner: &str, members: &[&str]) -> Board {
    Board {
        id: id.to_string(),
        name: format!("Board {}", id),
        url_name: format!("board-{}", id.to_lowercase()),
        owner_id: owner.to_string(),
        privacy: Privacy::Private,
        members: members.iter().map(|m| m.to_string()).collect(),
        created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        background: None,
    }
}

pub fn user_doc(boards: &[&str], pinned: &[&str]) -> UserDoc {
    UserDoc {
        boards: boards.iter().map(|b| b.to_string()).collect(),
        pinned_boards: pinned.iter().map(|b| b.to_string()).collect(),
    }
}

/// U1 owns A and B, is a member of C (owned by U2) and has pinned B.
pub async fn scenario() -> Result<(Arc<MemoryStore>, Arc<MemoryIndex>)> {
    let store = Arc::new(MemoryStore::new());
    let index = Arc::new(MemoryIndex::new());

    let boards = vec![
        board("A", "U1", &["U1"]),
        board("B", "U1", &["U1"]),
        board("C", "U2", &["U2", "U1"]),
    ];
    for b in &boards {
        store.insert_board(b.clone())?;
    }
    store.insert_user("U1", user_doc(&["A", "B"], &["B"]))?;
    store.insert_user("U2", user_doc(&["C"], &[]))?;
    index.save_boards(&boards).await?;

    Ok((store, index))
}
