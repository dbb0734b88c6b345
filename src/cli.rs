//! Command-line interface parsing for moviecache
//!
//! This module handles parsing of CLI arguments using clap and folds them,
//! together with the `OMDB_*` environment variables, into a `StartupConfig`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::data::omdb::OMDB_BASE_URL;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// A network command was run without an API key
    #[error("No OMDb API key. Pass --api-key or set OMDB_API_KEY.")]
    MissingApiKey,

    /// The base URL is not an http(s) URL
    #[error("Invalid base URL: '{0}'. Expected an http:// or https:// URL")]
    InvalidBaseUrl(String),

    /// The timeout must be at least one second
    #[error("Invalid timeout: must be at least 1 second")]
    InvalidTimeout,
}

/// moviecache - search a movie catalog with an offline page cache
#[derive(Parser, Debug)]
#[command(name = "moviecache")]
#[command(about = "Movie catalog search with an offline page cache")]
#[command(version)]
pub struct Cli {
    /// OMDb API key
    #[arg(long, env = "OMDB_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Catalog endpoint
    #[arg(long, env = "OMDB_BASE_URL", default_value = OMDB_BASE_URL, global = true)]
    pub base_url: String,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10, global = true)]
    pub timeout: u64,

    /// Directory for cached pages (defaults to the XDG cache directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Keep cached pages in memory only for this run
    #[arg(long, global = true)]
    pub no_persist: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search the catalog, loading one or more pages
    ///
    /// Examples:
    ///   moviecache search batman
    ///   moviecache search the dark knight --pages 3
    Search {
        /// Search terms
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Number of pages to load
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=100))]
        pages: u32,
    },

    /// Show full details for one or more catalog ids
    Detail {
        /// Catalog ids (e.g. tt0372784)
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Inspect or clear the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Read search input line by line from stdin
    ///
    /// Plain lines are treated as edits of the search box (debounced).
    /// Commands: :search <query>, :more, :refresh, :count, :clear, :quit
    Interactive,
}

/// Cache maintenance commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Print the number of cached pages
    Count,
    /// Delete cached pages
    Clear {
        /// Only delete pages older than the cache TTL
        #[arg(long)]
        expired: bool,
    },
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// OMDb API key, if any was supplied
    pub api_key: Option<String>,
    /// Catalog endpoint
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Explicit cache directory; `None` means the XDG default
    pub cache_dir: Option<PathBuf>,
    /// Whether cached pages are written to disk
    pub persist: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: OMDB_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            cache_dir: None,
            persist: true,
        }
    }
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError)` if the base URL or timeout is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let base_url = cli.base_url.trim().to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CliError::InvalidBaseUrl(base_url));
        }
        if cli.timeout == 0 {
            return Err(CliError::InvalidTimeout);
        }

        let api_key = cli
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        Ok(StartupConfig {
            api_key,
            base_url,
            timeout: Duration::from_secs(cli.timeout),
            cache_dir: cli.cache_dir.clone(),
            persist: !cli.no_persist,
        })
    }

    /// Returns the API key, required for any command that reaches the catalog
    pub fn require_api_key(&self) -> Result<&str, CliError> {
        self.api_key.as_deref().ok_or(CliError::MissingApiKey)
    }
}
