//! Board creation and index backfill.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use corkboard_common::wire::CreateBoardRequest;
use corkboard_common::{BOARD_NAME_MAX_LEN, Board, BoardId, UserArray, normalize_board_name, slugify};

use super::search::SearchIndex;
use super::store::DocumentStore;
use crate::errors::{BoardError, BoardResult};

/// Boards sent to the index per batch during a backfill.
pub const REINDEX_BATCH_SIZE: usize = 1000;

/// Create a board owned by `request.user_id` and record it on the user.
///
/// The store write is authoritative; a failed index write is logged and
/// the board shows up in aggregations once the index catches up.
pub async fn create_board(
    store: &dyn DocumentStore,
    index: &dyn SearchIndex,
    request: CreateBoardRequest,
) -> BoardResult<Board> {
    if request.user_id.trim().is_empty() {
        return Err(BoardError::Unauthenticated);
    }
    let name = normalize_board_name(&request.title);
    if name.is_empty() {
        return Err(BoardError::BadRequest("title is required".to_string()));
    }
    let Some(privacy) = request.privacy else {
        return Err(BoardError::BadRequest("privacy is required".to_string()));
    };
    let Some(background) = request.background else {
        return Err(BoardError::BadRequest("background is required".to_string()));
    };

    let board = Board {
        id: new_board_id(),
        url_name: slugify(&name, BOARD_NAME_MAX_LEN),
        name,
        owner_id: request.user_id.clone(),
        privacy,
        members: vec![request.user_id.clone()],
        created_at: Utc::now(),
        background: Some(background),
    };

    store.put_board(&board).await.map_err(BoardError::Transient)?;
    store
        .add_to_user_array(&request.user_id, UserArray::Boards, &board.id, true)
        .await
        .map_err(BoardError::Transient)?;

    if let Err(e) = index.save_boards(std::slice::from_ref(&board)).await {
        warn!(board_id = %board.id, error = %e, "Failed to index new board");
    }

    info!(board_id = %board.id, owner = %board.owner_id, "Board created");
    Ok(board)
}

fn new_board_id() -> BoardId {
    Uuid::new_v4().to_string()
}

/// Copy every board in the store into the index. Returns the number saved.
pub async fn reindex_boards(
    store: &dyn DocumentStore,
    index: &dyn SearchIndex,
) -> BoardResult<usize> {
    let boards = store.list_boards().await.map_err(BoardError::Transient)?;
    for (n, batch) in boards.chunks(REINDEX_BATCH_SIZE).enumerate() {
        index
            .save_boards(batch)
            .await
            .map_err(BoardError::Transient)?;
        info!(batch = n + 1, boards = batch.len(), "Indexed batch");
    }
    Ok(boards.len())
}
