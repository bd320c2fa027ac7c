//! gitrank CLI - runs the daily GitHub ranking pipeline.

mod commands;
mod config;

use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gitrank")]
#[command(version)]
#[command(about = "Daily GitHub repository and account rankings")]
#[command(
    long_about = "gitrank harvests the most-starred repositories and most-followed accounts \
from the GitHub GraphQL API, keeps the latest snapshot in a local database, computes \
1/7/30 day star growth from archived snapshots, and publishes ranked JSON files."
)]
#[command(after_long_help = r#"EXAMPLES
    Run the full pipeline:
        $ gitrank run

    Regenerate artifacts from the stored snapshot without calling GitHub:
        $ gitrank run --skip-fetch

    Rebuild the archive index after moving files around:
        $ gitrank archive reindex

CONFIGURATION
    gitrank reads configuration from:
      1. ~/.config/gitrank/config.toml (or $XDG_CONFIG_HOME/gitrank/config.toml)
      2. ./gitrank.toml
      3. Environment variables (GITRANK_* prefix, nested keys with "__",
         e.g. GITRANK_FETCH__ACCOUNT_LIMIT=500)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GITRANK_DATABASE_URL      Database connection string (default: ~/.local/state/gitrank/gitrank.db)
    GITRANK_GITHUB_TOKEN      GitHub personal access token
    GITHUB_TOKEN              Used when no gitrank-specific token is configured
    GITRANK_DATA_DIR          Directory for artifacts and the archive (default: ./data)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline: fetch, deltas, artifacts, archive, verify
    Run {
        /// Reuse the stored snapshot instead of querying GitHub
        #[arg(long)]
        skip_fetch: bool,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Archive maintenance
    Archive {
        #[command(subcommand)]
        action: ArchiveAction,
    },
    /// Recompute 1/7/30 day star growth from the archive
    Deltas,
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[derive(Subcommand)]
enum ArchiveAction {
    /// Rescan the archive tree and rewrite archive_index.json
    Reindex,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("gitrank=info,gitrank_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = config::Config::load();

    if let Commands::Archive { action } = &cli.command {
        commands::archive::handle_archive(action, &config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set GITRANK_DATABASE_URL")?;

    ensure_sqlite_parent(&database_url)?;

    match cli.command {
        Commands::Run { skip_fetch } => {
            commands::run::handle_run(&config, &database_url, skip_fetch).await
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Deltas => {
            commands::deltas::handle_deltas(&config, &database_url).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Archive { .. } => Ok(ExitCode::SUCCESS),
    }
}

/// Create the directory holding a file-backed SQLite store.
fn ensure_sqlite_parent(database_url: &str) -> std::io::Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = Path::new(rest.split_once('?').map_or(rest, |(path, _)| path));

    if path.is_relative() && !path.as_os_str().is_empty() {
        tracing::warn!(
            path = %path.display(),
            "Store path is relative to the working directory"
        );
    }

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
