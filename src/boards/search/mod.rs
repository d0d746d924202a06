//! Search index boundary.
//!
//! The index holds denormalised [`BoardReference`]s and is only ever used to
//! find board ids; board content is always re-read from the document store.

pub mod filter;
pub mod hosted;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use corkboard_common::{Board, BoardReference};

use crate::config::{SearchBackend, SearchSection};

pub use filter::{Filter, FilterTarget};
pub use hosted::HostedIndex;
pub use memory::MemoryIndex;

/// Hits returned by a free-text search when the caller does not say.
pub const DEFAULT_HITS_PER_PAGE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Free-text query; empty matches everything the filter allows.
    pub query: String,
    pub filters: Option<Filter>,
    pub hits_per_page: usize,
}

impl SearchRequest {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: None,
            hits_per_page: DEFAULT_HITS_PER_PAGE,
        }
    }

    pub fn filtered(filter: Filter, hits_per_page: usize) -> Self {
        Self {
            query: String::new(),
            filters: Some(filter),
            hits_per_page,
        }
    }
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<BoardReference>>;

    /// Upsert the index entries for `boards`.
    async fn save_boards(&self, boards: &[Board]) -> Result<()>;
}

/// Build the index selected by `config.backend`.
pub fn build_index(config: &SearchSection) -> Result<Arc<dyn SearchIndex>> {
    match config.backend {
        SearchBackend::Memory => Ok(Arc::new(MemoryIndex::new())),
        SearchBackend::Hosted => Ok(Arc::new(HostedIndex::from_config(config)?)),
    }
}
