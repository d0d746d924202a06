//! Configuration for the board back-end.
//!
//! Settings come from `corkboard.toml` and are layered file → environment
//! → CLI flags. A `.env` file in the working directory is loaded before the
//! environment layer is applied.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! port = 5050
//! frontend_url = "http://localhost:3000"
//! dev_mode = false
//!
//! [store]
//! path = ".corkboard/corkboard.db"
//!
//! [search]
//! backend = "hosted"
//! app_id = "ABCDEF1234"
//! index_name = "boards"
//! shared_page_size = 50
//!
//! [logging]
//! level = "info"
//! json = false
//! directory = ".corkboard/logs"
//! ```
//!
//! The search API key is never read from the file; set `SEARCH_API_KEY`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::boards::aggregate::DEFAULT_SHARED_PAGE_SIZE;

pub const DEFAULT_CONFIG_FILE: &str = "corkboard.toml";

/// Largest page the hosted index accepts for a single query.
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    /// In-process index rebuilt from the document store at start-up.
    #[default]
    Memory,
    /// Algolia-compatible hosted index reached over HTTPS.
    Hosted,
}

impl std::fmt::Display for SearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchBackend::Memory => write!(f, "memory"),
            SearchBackend::Hosted => write!(f, "hosted"),
        }
    }
}

impl std::str::FromStr for SearchBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(SearchBackend::Memory),
            "hosted" => Ok(SearchBackend::Hosted),
            _ => anyhow::bail!("Invalid search backend '{}'. Valid values: memory, hosted", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin allowed by CORS; any origin when unset.
    #[serde(default)]
    pub frontend_url: Option<String>,
    /// Bind on all interfaces with permissive CORS.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_port() -> u16 {
    5050
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            frontend_url: None,
            dev_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".corkboard/corkboard.db")
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSection {
    #[serde(default)]
    pub backend: SearchBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Override for the hosted endpoint; derived from `app_id` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    /// Page cap for the "shared with me" query.
    #[serde(default = "default_shared_page_size")]
    pub shared_page_size: usize,
}

fn default_index_name() -> String {
    "boards".to_string()
}

fn default_shared_page_size() -> usize {
    DEFAULT_SHARED_PAGE_SIZE
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            backend: SearchBackend::default(),
            app_id: None,
            api_key: None,
            base_url: None,
            index_name: default_index_name(),
            shared_page_size: default_shared_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Also write daily-rotated log files here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
        }
    }
}

/// Root of `corkboard.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse corkboard.toml")
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Load the file if it exists (defaults otherwise), then apply `.env` and
    /// process environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        // A missing .env is the normal case; a broken one is a config error.
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("Failed to load .env"),
        }
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize corkboard.toml")?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides through `lookup` (injected for tests).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = lookup("FRONTEND_URL") {
            self.server.frontend_url = Some(url);
        }
        if let Some(path) = lookup("CORKBOARD_DB") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(backend) = lookup("SEARCH_BACKEND").and_then(|v| v.parse().ok()) {
            self.search.backend = backend;
        }
        if let Some(app_id) = lookup("SEARCH_APP_ID") {
            self.search.app_id = Some(app_id);
        }
        if let Some(key) = lookup("SEARCH_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Some(index) = lookup("SEARCH_INDEX") {
            self.search.index_name = index;
        }
    }

    /// Return human-readable problems with this configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port must be non-zero".to_string());
        }
        if self.search.shared_page_size == 0 || self.search.shared_page_size > MAX_PAGE_SIZE {
            warnings.push(format!(
                "search.shared_page_size {} must be between 1 and {}",
                self.search.shared_page_size, MAX_PAGE_SIZE
            ));
        }
        if self.search.index_name.trim().is_empty() {
            warnings.push("search.index_name must not be empty".to_string());
        }
        if self.search.backend == SearchBackend::Hosted {
            if self.search.app_id.is_none() && self.search.base_url.is_none() {
                warnings.push(
                    "hosted search needs search.app_id (or search.base_url)".to_string(),
                );
            }
            if self.search.api_key.is_none() {
                warnings.push("hosted search needs SEARCH_API_KEY in the environment".to_string());
            }
        }
        if self.logging.level.parse::<tracing_subscriber::EnvFilter>().is_err() {
            warnings.push(format!("Invalid logging.level '{}'", self.logging.level));
        }

        warnings
    }
}
