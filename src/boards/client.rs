//! HTTP client for the board API.
//!
//! Lets a [`BoardSession`](super::view::BoardSession) run against a remote
//! server: `ApiClient` is both its [`BoardSource`] and its
//! [`PinPersistence`].

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use corkboard_common::wire::{
    CreateBoardRequest, CreateBoardResponse, ErrorBody, PinBoardRequest, PinBoardResponse,
    SearchHit,
};
use corkboard_common::{Board, BoardLists};

use super::aggregate::BoardSource;
use super::pin::PinPersistence;
use crate::errors::{BoardError, BoardResult, DocumentKind};

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/api/board/{id}` with the id percent-encoded as one path segment.
    fn board_url(&self, board_id: &str) -> BoardResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API base URL '{}'", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API base URL '{}' cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(["api", "board", board_id]);
        Ok(url)
    }

    pub async fn fetch_boards(&self, user_id: &str) -> BoardResult<BoardLists> {
        let resp = self
            .client
            .get(self.url("/api/user/boards"))
            .query(&[("userId", user_id)])
            .send()
            .await
            .map_err(transport)?;
        decode(resp, DocumentKind::User, user_id).await
    }

    pub async fn pin_board(&self, user_id: &str, board_id: &str) -> BoardResult<PinBoardResponse> {
        let body = PinBoardRequest {
            user_id: user_id.to_string(),
            board_id: board_id.to_string(),
        };
        let resp = self
            .client
            .post(self.url("/api/user/pin-board"))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        decode(resp, DocumentKind::User, user_id).await
    }

    /// Returns the new board's id.
    pub async fn create_board(&self, request: &CreateBoardRequest) -> BoardResult<String> {
        let resp = self
            .client
            .post(self.url("/api/user/boards"))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let created: CreateBoardResponse = decode(resp, DocumentKind::User, &request.user_id).await?;
        Ok(created.board_id)
    }

    pub async fn get_board(&self, board_id: &str) -> BoardResult<Board> {
        let resp = self
            .client
            .get(self.board_url(board_id)?)
            .send()
            .await
            .map_err(transport)?;
        decode(resp, DocumentKind::Board, board_id).await
    }

    pub async fn search(&self, query: &str) -> BoardResult<Vec<SearchHit>> {
        let resp = self
            .client
            .get(self.url("/api/search"))
            .query(&[("q", query)])
            .send()
            .await
            .map_err(transport)?;
        decode(resp, DocumentKind::Board, query).await
    }
}

fn transport(err: reqwest::Error) -> BoardError {
    BoardError::Transient(anyhow::Error::new(err).context("Board API request failed"))
}

/// Decode a 2xx body, or map the status to a [`BoardError`].
async fn decode<T: DeserializeOwned>(
    resp: reqwest::Response,
    kind: DocumentKind,
    id: &str,
) -> BoardResult<T> {
    let status = resp.status();
    if status.is_success() {
        return resp.json::<T>().await.map_err(transport);
    }

    let message = resp
        .json::<ErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| status.to_string());
    debug!(%status, %message, "Board API returned an error");

    Err(match status {
        StatusCode::UNAUTHORIZED => BoardError::Unauthenticated,
        StatusCode::NOT_FOUND => BoardError::NotFound {
            kind,
            id: id.to_string(),
        },
        StatusCode::BAD_REQUEST => BoardError::BadRequest(message),
        _ => BoardError::Transient(anyhow::anyhow!("Board API returned {}: {}", status, message)),
    })
}

#[async_trait]
impl PinPersistence for ApiClient {
    async fn toggle_pin(&self, user_id: &str, board_id: &str) -> BoardResult<bool> {
        Ok(self.pin_board(user_id, board_id).await?.pinned)
    }
}

#[async_trait]
impl BoardSource for ApiClient {
    async fn load_boards(&self, user_id: &str) -> BoardResult<BoardLists> {
        self.fetch_boards(user_id).await
    }
}
