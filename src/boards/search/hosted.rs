//! Algolia-compatible hosted index over HTTPS.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use corkboard_common::{Board, BoardReference};

use super::{SearchIndex, SearchRequest};
use crate::config::SearchSection;

const APP_ID_HEADER: &str = "X-Algolia-Application-Id";
const API_KEY_HEADER: &str = "X-Algolia-API-Key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<String>,
    hits_per_page: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    hits: Vec<BoardReference>,
}

#[derive(Debug, Serialize)]
struct BatchBody {
    requests: Vec<BatchOperation>,
}

#[derive(Debug, Serialize)]
struct BatchOperation {
    action: &'static str,
    body: IndexRecord,
}

/// Shape of one index record: the board with `objectID` as its key.
#[derive(Debug, Serialize)]
struct IndexRecord {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(flatten)]
    board: Board,
}

fn query_body(request: &SearchRequest) -> QueryBody {
    QueryBody {
        query: request.query.clone(),
        filters: request.filters.as_ref().map(ToString::to_string),
        hits_per_page: request.hits_per_page,
    }
}

fn batch_body(boards: &[Board]) -> BatchBody {
    BatchBody {
        requests: boards
            .iter()
            .map(|board| BatchOperation {
                action: "updateObject",
                body: IndexRecord {
                    object_id: board.id.clone(),
                    board: board.clone(),
                },
            })
            .collect(),
    }
}

pub struct HostedIndex {
    client: reqwest::Client,
    base_url: String,
    index_name: String,
    app_id: String,
    api_key: String,
}

impl HostedIndex {
    pub fn new(
        base_url: impl Into<String>,
        index_name: impl Into<String>,
        app_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index_name: index_name.into(),
            app_id: app_id.into(),
            api_key: api_key.into(),
        }
    }

    /// The endpoint defaults to `https://<app_id>-dsn.algolia.net`.
    pub fn from_config(config: &SearchSection) -> Result<Self> {
        let Some(api_key) = config.api_key.as_deref() else {
            bail!("Hosted search requires SEARCH_API_KEY");
        };
        let app_id = config.app_id.clone().unwrap_or_default();
        let base_url = match (&config.base_url, app_id.is_empty()) {
            (Some(url), _) => url.clone(),
            (None, false) => format!("https://{}-dsn.algolia.net", app_id),
            (None, true) => bail!("Hosted search requires search.app_id or search.base_url"),
        };
        Ok(Self::new(base_url, &config.index_name, app_id, api_key))
    }

    fn url(&self, action: &str) -> String {
        format!("{}/1/indexes/{}/{}", self.base_url, self.index_name, action)
    }
}

#[async_trait]
impl SearchIndex for HostedIndex {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<BoardReference>> {
        let resp: QueryResponse = self
            .client
            .post(self.url("query"))
            .header(APP_ID_HEADER, &self.app_id)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&query_body(request))
            .send()
            .await
            .context("Failed to send query to search index")?
            .error_for_status()
            .context("Search index returned error status")?
            .json()
            .await
            .context("Failed to parse search index response")?;
        Ok(resp.hits)
    }

    async fn save_boards(&self, boards: &[Board]) -> Result<()> {
        if boards.is_empty() {
            return Ok(());
        }
        self.client
            .post(self.url("batch"))
            .header(APP_ID_HEADER, &self.app_id)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&batch_body(boards))
            .send()
            .await
            .context("Failed to send batch to search index")?
            .error_for_status()
            .context("Search index rejected batch")?;
        Ok(())
    }
}
