use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;

use corkboard_common::{Board, BoardReference};

use super::{FilterTarget, SearchIndex, SearchRequest};

impl FilterTarget for Board {
    fn attribute_values(&self, attribute: &str) -> Vec<&str> {
        match attribute {
            "objectID" | "id" => vec![self.id.as_str()],
            "ownerId" => vec![self.owner_id.as_str()],
            "members" => self.members.iter().map(String::as_str).collect(),
            "privacy" => vec![self.privacy.as_str()],
            "name" => vec![self.name.as_str()],
            _ => Vec::new(),
        }
    }
}

#[derive(Default)]
struct IndexState {
    entries: Vec<Board>,
    requests: Vec<SearchRequest>,
    unavailable: bool,
}

/// In-process index over full board records.
///
/// Entries are a snapshot taken at save time, so they go stale exactly the
/// way a hosted index does when the store changes underneath it.
#[derive(Default)]
pub struct MemoryIndex {
    state: Mutex<IndexState>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, IndexState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Search index lock poisoned"))
    }

    /// Make every call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) -> Result<()> {
        self.state()?.unavailable = unavailable;
        Ok(())
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.state().map(|s| s.requests.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.state().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<BoardReference>> {
        let mut state = self.state()?;
        state.requests.push(request.clone());
        if state.unavailable {
            bail!("search index unavailable");
        }

        let needle = request.query.trim().to_lowercase();
        let hits = state
            .entries
            .iter()
            .filter(|board| needle.is_empty() || board.name.to_lowercase().contains(&needle))
            .filter(|board| {
                request
                    .filters
                    .as_ref()
                    .is_none_or(|filter| filter.matches(*board))
            })
            .take(request.hits_per_page)
            .map(Board::to_reference)
            .collect();
        Ok(hits)
    }

    async fn save_boards(&self, boards: &[Board]) -> Result<()> {
        let mut state = self.state()?;
        if state.unavailable {
            bail!("search index unavailable");
        }
        for board in boards {
            match state.entries.iter_mut().find(|e| e.id == board.id) {
                Some(existing) => *existing = board.clone(),
                None => state.entries.push(board.clone()),
            }
        }
        Ok(())
    }
}
