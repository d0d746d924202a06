//! One-shot board commands against the configured store and index.

use anyhow::Result;

use corkboard::boards::aggregate::BoardQuery;
use corkboard::boards::create::{create_board, reindex_boards};
use corkboard::boards::pin::toggle_pin;
use corkboard::boards::search::build_index;
use corkboard::boards::server::{open_backends, open_store};
use corkboard::config::AppConfig;
use corkboard_common::wire::{CreateBoardRequest, PinBoardResponse};
use corkboard_common::{Background, BackgroundKind, Privacy};

pub async fn cmd_boards(config: &AppConfig, user_id: &str) -> Result<()> {
    let (store, index) = open_backends(config).await?;
    let lists = BoardQuery::new(store, index)
        .with_shared_page_size(config.search.shared_page_size)
        .fetch(user_id)
        .await?;
    println!("{}", serde_json::to_string_pretty(&lists)?);
    Ok(())
}

pub async fn cmd_pin(config: &AppConfig, user_id: &str, board_id: &str) -> Result<()> {
    let store = open_store(&config.store)?;
    let pinned = toggle_pin(&store, user_id, board_id).await?;
    println!("{}", PinBoardResponse::new(pinned).message);
    Ok(())
}

pub async fn cmd_create(
    config: &AppConfig,
    user_id: &str,
    title: &str,
    privacy: &str,
    color: &str,
) -> Result<()> {
    let privacy: Privacy = privacy.parse().map_err(anyhow::Error::msg)?;
    let (store, index) = open_backends(config).await?;

    let request = CreateBoardRequest {
        user_id: user_id.to_string(),
        title: title.to_string(),
        privacy: Some(privacy),
        background: Some(Background {
            kind: BackgroundKind::Color,
            value: color.to_string(),
        }),
    };
    let board = create_board(store.as_ref(), index.as_ref(), request).await?;
    println!("Created board {} ({})", board.name, board.id);
    Ok(())
}

pub async fn cmd_reindex(config: &AppConfig) -> Result<()> {
    let store = open_store(&config.store)?;
    let index = build_index(&config.search)?;
    let count = reindex_boards(&store, index.as_ref()).await?;
    println!(
        "Indexed {} boards into '{}' ({} backend)",
        count, config.search.index_name, config.search.backend
    );
    Ok(())
}
