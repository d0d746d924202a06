use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::error;

use corkboard_common::BoardLists;
use corkboard_common::wire::{
    CreateBoardRequest, CreateBoardResponse, PinBoardRequest, PinBoardResponse, SearchHit,
};

use super::aggregate::BoardQuery;
use super::create::create_board;
use super::pin::toggle_pin;
use super::search::{SearchIndex, SearchRequest};
use super::store::DocumentStore;
use crate::errors::BoardError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub index: Arc<dyn SearchIndex>,
    pub query: BoardQuery,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: Arc<dyn SearchIndex>,
        shared_page_size: usize,
    ) -> Self {
        let query = BoardQuery::new(store.clone(), index.clone())
            .with_shared_page_size(shared_page_size);
        Self {
            store,
            index,
            query,
        }
    }
}

pub type SharedState = Arc<AppState>;

// ── Request parameters ────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserParams {
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::Unauthenticated => ApiError::Unauthorized("Missing userId".to_string()),
            BoardError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            BoardError::BadRequest(msg) => ApiError::BadRequest(msg),
            other => {
                error!(error = %other, "Request failed");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/user/boards", get(list_user_boards).post(create_user_board))
        .route("/api/user/pin-board", post(pin_board))
        .route("/api/board/{id}", get(get_board))
        .route("/api/search", get(search_boards))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_user_boards(
    State(state): State<SharedState>,
    Query(params): Query<UserParams>,
) -> Result<Json<BoardLists>, ApiError> {
    let user_id = params.user_id.unwrap_or_default();
    let lists = state.query.fetch(&user_id).await?;
    Ok(Json(lists))
}

async fn pin_board(
    State(state): State<SharedState>,
    body: Result<Json<PinBoardRequest>, JsonRejection>,
) -> Result<Json<PinBoardResponse>, ApiError> {
    let Json(req) = body?;
    let pinned = toggle_pin(state.store.as_ref(), &req.user_id, &req.board_id).await?;
    Ok(Json(PinBoardResponse::new(pinned)))
}

async fn create_user_board(
    State(state): State<SharedState>,
    body: Result<Json<CreateBoardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let board = create_board(state.store.as_ref(), state.index.as_ref(), req).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateBoardResponse { board_id: board.id }),
    ))
}

async fn get_board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state
        .store
        .get_board(&id)
        .await
        .map_err(BoardError::Transient)?
        .ok_or_else(|| BoardError::board_not_found(&id))?;
    Ok(Json(board))
}

async fn search_boards(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing query parameter".to_string()));
    }
    let hits = state
        .index
        .search(&SearchRequest::text(query))
        .await
        .map_err(|e| {
            error!(error = %e, "Search failed");
            ApiError::Internal("Search failed".to_string())
        })?;
    Ok(Json(hits.into_iter().map(SearchHit::from).collect()))
}
