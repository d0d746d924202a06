//! Board aggregation query.
//!
//! Assembles a user's owned, shared and pinned board lists. The search index
//! only says *which* boards to show; every board is re-read from the
//! document store before it is returned, and anything that fails to resolve
//! is dropped rather than reported.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use corkboard_common::{Board, BoardId, BoardLists, BoardReference, PinnedBoard, UserDoc};

use super::search::{Filter, SearchIndex, SearchRequest};
use super::store::DocumentStore;
use crate::config::MAX_PAGE_SIZE;
use crate::errors::{BoardError, BoardResult};

/// Page cap for the "shared with me" index query.
pub const DEFAULT_SHARED_PAGE_SIZE: usize = 50;

/// Anything that can produce a user's board lists.
#[async_trait]
pub trait BoardSource: Send + Sync {
    async fn load_boards(&self, user_id: &str) -> BoardResult<BoardLists>;
}

#[derive(Clone)]
pub struct BoardQuery {
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn SearchIndex>,
    shared_page_size: usize,
}

impl BoardQuery {
    pub fn new(store: Arc<dyn DocumentStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self {
            store,
            index,
            shared_page_size: DEFAULT_SHARED_PAGE_SIZE,
        }
    }

    pub fn with_shared_page_size(mut self, size: usize) -> Self {
        self.shared_page_size = size;
        self
    }

    /// Build the three lists for `user_id`.
    ///
    /// Only an empty user id is an error; store and index failures degrade
    /// the affected list to empty.
    pub async fn fetch(&self, user_id: &str) -> BoardResult<BoardLists> {
        if user_id.trim().is_empty() {
            return Err(BoardError::Unauthenticated);
        }

        let user = self.read_user(user_id).await;

        let (owned_refs, shared_refs) = futures::join!(
            self.owned_references(&user.boards),
            self.shared_references(user_id)
        );

        let (mut owned, mut shared) =
            futures::join!(self.resolve(&owned_refs), self.resolve(&shared_refs));

        // The index may lag behind ownership and membership changes.
        shared.retain(|board| board.owner_id != user_id && board.is_member(user_id));

        owned.sort_by_key(|board| {
            user.boards
                .iter()
                .position(|id| *id == board.id)
                .unwrap_or(usize::MAX)
        });

        let owned = annotate(owned, &user);
        let shared = annotate(shared, &user);
        let pinned = derive_pinned(&owned, &shared);

        info!(
            user_id,
            owned = owned.len(),
            shared = shared.len(),
            pinned = pinned.len(),
            "Aggregated boards"
        );

        Ok(BoardLists {
            owned,
            shared,
            pinned,
        })
    }

    async fn read_user(&self, user_id: &str) -> UserDoc {
        match self.store.get_user(user_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                debug!(user_id, "No user document; treating as empty");
                UserDoc::default()
            }
            Err(e) => {
                warn!(user_id, error = %e, "User document read failed; treating as empty");
                UserDoc::default()
            }
        }
    }

    /// One index query per `MAX_PAGE_SIZE` ids, run concurrently.
    async fn owned_references(&self, ids: &[BoardId]) -> Vec<BoardReference> {
        // An empty filter matches the whole index, so no query is sent for
        // an empty id list.
        let requests: Vec<SearchRequest> = ids
            .chunks(MAX_PAGE_SIZE)
            .filter_map(|chunk| {
                Filter::any_object_id(chunk.iter().cloned())
                    .map(|filter| SearchRequest::filtered(filter, chunk.len()))
            })
            .collect();
        if requests.len() > 1 {
            debug!(ids = ids.len(), queries = requests.len(), "Owned query split");
        }

        join_all(requests.iter().map(|request| self.query_index("owned", request)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn shared_references(&self, user_id: &str) -> Vec<BoardReference> {
        let request = SearchRequest::filtered(Filter::shared_with(user_id), self.shared_page_size);
        self.query_index("shared", &request).await
    }

    async fn query_index(&self, list: &str, request: &SearchRequest) -> Vec<BoardReference> {
        match self.index.search(request).await {
            Ok(hits) => {
                debug!(list, hits = hits.len(), "Index query returned");
                hits
            }
            Err(e) => {
                warn!(list, error = %e, "Index query failed; list degraded to empty");
                Vec::new()
            }
        }
    }

    /// Re-read every referenced board from the store, independently.
    async fn resolve(&self, refs: &[BoardReference]) -> Vec<Board> {
        let mut seen = HashSet::new();
        let ids: Vec<&str> = refs
            .iter()
            .map(|r| r.id.as_str())
            .filter(|id| seen.insert(*id))
            .collect();

        join_all(ids.into_iter().map(|id| self.resolve_one(id)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn resolve_one(&self, board_id: &str) -> Option<Board> {
        match self.store.get_board(board_id).await {
            Ok(Some(board)) => Some(board),
            Ok(None) => {
                debug!(board_id, "Indexed board missing from store; dropped");
                None
            }
            Err(e) => {
                warn!(board_id, error = %e, "Board read failed; dropped");
                None
            }
        }
    }
}

#[async_trait]
impl BoardSource for BoardQuery {
    async fn load_boards(&self, user_id: &str) -> BoardResult<BoardLists> {
        self.fetch(user_id).await
    }
}

fn annotate(boards: Vec<Board>, user: &UserDoc) -> Vec<PinnedBoard> {
    boards
        .into_iter()
        .map(|board| {
            let pinned = user.is_pinned(&board.id);
            PinnedBoard { board, pinned }
        })
        .collect()
}

/// `{b ∈ owned ∪ shared : b.pinned}`, each board once.
pub fn derive_pinned(owned: &[PinnedBoard], shared: &[PinnedBoard]) -> Vec<PinnedBoard> {
    let mut seen = HashSet::new();
    owned
        .iter()
        .chain(shared)
        .filter(|b| b.pinned && seen.insert(b.id().to_string()))
        .cloned()
        .collect()
}
