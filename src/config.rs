use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crawl::{CrawlOptions, ResolutionPolicy};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub artistgraph: GeneralConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    pub store: StoreConfig,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for crawl results, exports and rendered pages.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

/// Catalog provider (Spotify Web API) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding a pre-issued bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional ISO 3166-1 market passed to search requests.
    #[serde(default)]
    pub market: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            market: None,
        }
    }
}

/// Crawl behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_relation_depth")]
    pub relation_depth: u32,
    #[serde(default)]
    pub resolution_policy: ResolutionPolicy,
    /// Maximum number of provider calls in flight per crawl level.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Anchor level-0 artists to a synthetic `root` node when persisting.
    #[serde(default = "default_root_anchor")]
    pub root_anchor: bool,
    /// Only crawl the first N seeds (0 = all).
    #[serde(default)]
    pub seed_limit: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            relation_depth: default_relation_depth(),
            resolution_policy: ResolutionPolicy::default(),
            workers: default_workers(),
            root_anchor: default_root_anchor(),
            seed_limit: 0,
        }
    }
}

/// Graph store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

fn default_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_token_env() -> String {
    "SPOTIFY_ACCESS_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_relation_depth() -> u32 {
    1
}

fn default_workers() -> usize {
    1
}

fn default_root_anchor() -> bool {
    true
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in ARTISTGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("ARTISTGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.provider.base_url)
            .with_context(|| format!("provider.base_url is not a valid URL: {}", self.provider.base_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("provider.base_url must use http or https, got {}", url.scheme());
        }

        if self.provider.timeout_secs == 0 {
            anyhow::bail!("provider.timeout_secs must be greater than 0");
        }

        if self.crawl.relation_depth == 0 {
            anyhow::bail!("crawl.relation_depth must be at least 1");
        }

        if self.crawl.workers == 0 {
            anyhow::bail!("crawl.workers must be at least 1");
        }

        if self.store.busy_timeout_ms == 0 {
            anyhow::bail!("store.busy_timeout_ms must be greater than 0");
        }

        if self.store.db_path.as_os_str().is_empty() {
            anyhow::bail!("store.db_path must not be empty");
        }

        Ok(())
    }

    /// Read the provider bearer token from the configured environment variable
    pub fn provider_token(&self) -> Result<String> {
        std::env::var(&self.provider.token_env).with_context(|| {
            format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable with a catalog access token.",
                self.provider.token_env
            )
        })
    }

    /// Crawl options derived from the `[crawl]` section
    pub fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            relation_depth: self.crawl.relation_depth,
            resolution_policy: self.crawl.resolution_policy,
            workers: self.crawl.workers,
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_secs)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.store.busy_timeout_ms)
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.store.db_path
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.store.migrations_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.artistgraph.data_dir
    }
}
