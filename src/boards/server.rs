use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::api::{self, AppState};
use super::create::reindex_boards;
use super::db::{DbHandle, DocumentDb};
use super::search::{SearchIndex, build_index};
use super::store::DocumentStore;
use crate::config::{AppConfig, SearchBackend, ServerSection, StoreSection};

/// Open (creating if needed) the SQLite document store.
pub fn open_store(config: &StoreSection) -> Result<DbHandle> {
    if let Some(parent) = config.path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = DocumentDb::new(&config.path).context("Failed to initialize document database")?;
    Ok(DbHandle::new(db))
}

/// Open the store and the configured index. The in-memory index starts
/// empty, so it is filled from the store before it is returned.
pub async fn open_backends(
    config: &AppConfig,
) -> Result<(Arc<dyn DocumentStore>, Arc<dyn SearchIndex>)> {
    let store: Arc<dyn DocumentStore> = Arc::new(open_store(&config.store)?);
    let index = build_index(&config.search)?;

    if config.search.backend == SearchBackend::Memory {
        let count = reindex_boards(store.as_ref(), index.as_ref())
            .await
            .context("Failed to warm in-memory search index")?;
        info!(boards = count, "In-memory search index ready");
    }

    Ok((store, index))
}

fn cors_layer(config: &ServerSection) -> Result<CorsLayer> {
    if config.dev_mode {
        return Ok(CorsLayer::permissive());
    }
    match &config.frontend_url {
        Some(url) => {
            let origin: HeaderValue = url
                .parse()
                .with_context(|| format!("Invalid frontend_url: {}", url))?;
            Ok(CorsLayer::new()
                .allow_origin([origin])
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]))
        }
        None => Ok(CorsLayer::permissive()),
    }
}

/// Build the application router with request tracing and CORS.
pub fn build_router(state: Arc<AppState>, config: &ServerSection) -> Result<Router> {
    Ok(api::api_router()
        .with_state(state)
        .layer(cors_layer(config)?)
        .layer(TraceLayer::new_for_http()))
}

/// Start the board API server and run until Ctrl+C.
pub async fn start_server(config: &AppConfig) -> Result<()> {
    let (store, index) = open_backends(config).await?;
    let state = Arc::new(AppState::new(store, index, config.search.shared_page_size));
    let app = build_router(state, &config.server)?;

    let host = if config.server.dev_mode {
        "0.0.0.0"
    } else {
        "127.0.0.1"
    };
    let addr = format!("{}:{}", host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(
        address = %local_addr,
        search = %config.search.backend,
        "Corkboard API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutting down");
}
