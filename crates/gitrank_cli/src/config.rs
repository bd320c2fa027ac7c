//! Configuration file support for gitrank.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `GITRANK_`; nested keys use `__`,
//!    e.g. `GITRANK_OUTPUT__TRENDING_LIMIT`). `GITRANK_DATABASE_URL`,
//!    `GITRANK_GITHUB_TOKEN` and `GITRANK_DATA_DIR` are accepted as shorthands.
//! 3. Config file (./gitrank.toml, then ~/.config/gitrank/config.toml)
//! 4. Built-in defaults
//!
//! The GitHub token falls back to the plain `GITHUB_TOKEN` variable.
//!
//! ```toml
//! [github]
//! token = "ghp_..."
//! # max_rate_limit_waits = 30  # unset waits indefinitely
//!
//! [fetch]
//! repository_limit = -1   # -1 fetches everything the search reports
//!
//! [output]
//! data_dir = "data"
//! trending_limit = 500
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use gitrank::artifact::OutputOptions;
use gitrank::github::{AccountSearch, ClientOptions, FetchTarget};
use gitrank::pipeline::{FetchPlan, PipelineOptions};
use gitrank::retry::RetryPolicy;
use gitrank::store::QueryLimit;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Defaults to `sqlite://~/.local/state/gitrank/gitrank.db` if not specified.
    pub url: Option<String>,
}

/// GitHub API client configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token.
    pub token: Option<String>,
    /// Pause before every request.
    pub request_delay_ms: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub rate_limit_cooldown_secs: u64,
    /// Consecutive rate-limit cooldowns before giving up. Unset waits indefinitely.
    pub max_rate_limit_waits: Option<u32>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            request_delay_ms: 1000,
            max_retries: 3,
            retry_base_delay_ms: 2000,
            rate_limit_cooldown_secs: 10,
            max_rate_limit_waits: None,
        }
    }
}

/// What to fetch. Negative limits mean "everything the search reports".
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub repository_limit: i64,
    pub repository_page_size: u32,
    pub account_limit: i64,
    pub account_page_size: u32,
    /// Repositories per account summed into its star total.
    pub account_top_repositories: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            repository_limit: -1,
            repository_page_size: 100,
            account_limit: 1000,
            account_page_size: 25,
            account_top_repositories: 10,
        }
    }
}

/// Artifact output. Negative limits mean "all rows".
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub data_dir: PathBuf,
    pub top_repositories_limit: i64,
    pub trending_limit: i64,
    pub top_accounts_limit: i64,
    pub store_size_warn_mb: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            top_repositories_limit: -1,
            trending_limit: 500,
            top_accounts_limit: 1000,
            store_size_warn_mb: 100,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/gitrank/config.toml)
    /// 3. Local config file (./gitrank.toml)
    /// 4. Environment variables with GITRANK_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        // Add XDG config file if it exists
        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // Add local config file (higher priority than XDG)
        let local_config = PathBuf::from("gitrank.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./gitrank.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., GITRANK_FETCH__ACCOUNT_LIMIT -> fetch.account_limit
        builder = builder.add_source(
            Environment::with_prefix("GITRANK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        for (key, var) in [
            ("database.url", "GITRANK_DATABASE_URL"),
            ("github.token", "GITRANK_GITHUB_TOKEN"),
            ("output.data_dir", "GITRANK_DATA_DIR"),
        ] {
            builder = match builder.set_override_option(key, non_empty_env(var)) {
                Ok(builder) => builder,
                Err(e) => {
                    tracing::warn!("Ignoring {}: {}", var, e);
                    return Config::default();
                }
            };
        }

        // Build the config and deserialize
        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// If no database URL is configured, defaults to `sqlite://~/.local/state/gitrank/gitrank.db?mode=rwc`
    /// on Linux (using XDG state directory) or the platform-appropriate equivalent.
    /// The `mode=rwc` parameter enables read-write access and creates the file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("gitrank.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Get the GitHub token, falling back to `GITHUB_TOKEN`.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| non_empty_env("GITHUB_TOKEN"))
    }

    pub fn client_options(&self) -> ClientOptions {
        let github = &self.github;
        ClientOptions {
            token: self.github_token(),
            request_delay: Duration::from_millis(github.request_delay_ms),
            retry: RetryPolicy::new(
                Duration::from_millis(github.retry_base_delay_ms),
                github.max_retries,
            ),
            rate_limit_cooldown: Duration::from_secs(github.rate_limit_cooldown_secs),
            max_rate_limit_waits: github.max_rate_limit_waits,
            ..ClientOptions::default()
        }
    }

    pub fn fetch_plan(&self) -> FetchPlan {
        let fetch = &self.fetch;
        FetchPlan {
            repositories: FetchTarget::from_signed(fetch.repository_limit),
            repository_page_size: fetch.repository_page_size,
            account_search: AccountSearch {
                top_repositories: fetch.account_top_repositories,
                ..AccountSearch::default()
            },
            accounts: FetchTarget::from_signed(fetch.account_limit),
            account_page_size: fetch.account_page_size,
            ..FetchPlan::default()
        }
    }

    pub fn output_options(&self) -> OutputOptions {
        let output = &self.output;
        OutputOptions {
            data_dir: output.data_dir.clone(),
            top_repositories: QueryLimit::from_signed(output.top_repositories_limit),
            trending: QueryLimit::from_signed(output.trending_limit),
            top_accounts: QueryLimit::from_signed(output.top_accounts_limit),
        }
    }

    pub fn pipeline_options(&self, database_url: &str, skip_fetch: bool) -> PipelineOptions {
        PipelineOptions {
            database_url: database_url.to_string(),
            client: self.client_options(),
            fetch: self.fetch_plan(),
            output: self.output_options(),
            skip_fetch,
            store_size_warn_bytes: self.output.store_size_warn_mb.saturating_mul(1024 * 1024),
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gitrank").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/gitrank` or `~/.local/state/gitrank`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gitrank").map(|dirs| {
            // state_dir() returns None on macOS/Windows, fall back to data_dir
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
