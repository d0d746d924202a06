use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use corkboard::config::AppConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "corkboard")]
#[command(version, about = "Kanban board back-end: board lists, pinning and search")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to corkboard.toml (defaults to ./corkboard.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to serve on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (bind all interfaces, permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// Create the document store
    Init,
    /// Copy every board from the store into the search index
    Reindex,
    /// Print a user's owned, shared and pinned boards as JSON
    Boards { user_id: String },
    /// Toggle a board in a user's pinned set
    Pin { user_id: String, board_id: String },
    /// Create a board owned by a user
    Create {
        user_id: String,
        title: String,

        /// private or public
        #[arg(long, default_value = "private")]
        privacy: String,

        /// Background colour
        #[arg(long, default_value = "#6366f1")]
        color: String,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default corkboard.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.config.as_deref())?;
    let _log_guard = corkboard::logging::init_tracing(&config.logging, cli.verbose)?;

    match &cli.command {
        Commands::Serve { port, dev } => cmd::cmd_serve(config, *port, *dev).await?,
        Commands::Init => cmd::cmd_init(&config)?,
        Commands::Reindex => cmd::cmd_reindex(&config).await?,
        Commands::Boards { user_id } => cmd::cmd_boards(&config, user_id).await?,
        Commands::Pin { user_id, board_id } => cmd::cmd_pin(&config, user_id, board_id).await?,
        Commands::Create {
            user_id,
            title,
            privacy,
            color,
        } => cmd::cmd_create(&config, user_id, title, privacy, color).await?,
        Commands::Config { command } => {
            cmd::cmd_config(&config, cli.config.as_deref(), command.clone())?
        }
    }

    Ok(())
}
