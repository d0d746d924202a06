//! API server commands: `corkboard serve`, `corkboard init`.

use anyhow::Result;
use tracing::warn;

use corkboard::boards::server::{open_store, start_server};
use corkboard::config::AppConfig;

pub async fn cmd_serve(mut config: AppConfig, port: Option<u16>, dev: bool) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if dev {
        config.server.dev_mode = true;
    }
    for problem in config.validate() {
        warn!(%problem, "Configuration problem");
    }

    start_server(&config).await
}

pub fn cmd_init(config: &AppConfig) -> Result<()> {
    open_store(&config.store)?;
    println!(
        "Document store initialized at {}",
        config.store.path.display()
    );
    Ok(())
}
