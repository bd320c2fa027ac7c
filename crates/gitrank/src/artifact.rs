//! Ranked JSON artifacts written to the data directory.
//!
//! Each [`ArtifactKind`] is one file: a `meta` block plus a ranked list read
//! from the snapshot store. Files are written to a temporary sibling first and
//! renamed into place, so readers never see a half-written artifact.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::account::Model as AccountModel;
use crate::entity::repository::Model as RepositoryModel;
use crate::store::{self, AccountMetric, QueryLimit, RepositoryMetric, StoreError};

/// Timestamp format of `meta.updated_at`.
pub const UPDATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Rows in each trending list.
pub const DEFAULT_TRENDING_LIMIT: u64 = 500;

/// Rows in the top-accounts list.
pub const DEFAULT_TOP_ACCOUNTS_LIMIT: u64 = 1000;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArtifactError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArtifactError>;

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// Which table an artifact ranks, and by what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    Repositories(RepositoryMetric),
    Accounts(AccountMetric),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    TopRepositories,
    DailyTrending,
    WeeklyTrending,
    MonthlyTrending,
    TopAccounts,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::TopRepositories,
        ArtifactKind::DailyTrending,
        ArtifactKind::WeeklyTrending,
        ArtifactKind::MonthlyTrending,
        ArtifactKind::TopAccounts,
    ];

    pub fn file_stem(self) -> &'static str {
        match self {
            ArtifactKind::TopRepositories => "top_repos_list",
            ArtifactKind::DailyTrending => "daily_trending",
            ArtifactKind::WeeklyTrending => "weekly_trending",
            ArtifactKind::MonthlyTrending => "monthly_trending",
            ArtifactKind::TopAccounts => "top_users_list",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.file_stem())
    }

    pub fn ranking(self) -> Ranking {
        match self {
            ArtifactKind::TopRepositories => Ranking::Repositories(RepositoryMetric::Stars),
            ArtifactKind::DailyTrending => Ranking::Repositories(RepositoryMetric::Stars1d),
            ArtifactKind::WeeklyTrending => Ranking::Repositories(RepositoryMetric::Stars7d),
            ArtifactKind::MonthlyTrending => Ranking::Repositories(RepositoryMetric::Stars30d),
            ArtifactKind::TopAccounts => Ranking::Accounts(AccountMetric::Followers),
        }
    }

    /// The `meta.order_by` value.
    pub fn order_by(self) -> &'static str {
        match self.ranking() {
            Ranking::Repositories(metric) => metric.as_str(),
            Ranking::Accounts(_) => "followersCount",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub data_dir: PathBuf,
    pub top_repositories: QueryLimit,
    pub trending: QueryLimit,
    pub top_accounts: QueryLimit,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            top_repositories: QueryLimit::All,
            trending: QueryLimit::Top(DEFAULT_TRENDING_LIMIT),
            top_accounts: QueryLimit::Top(DEFAULT_TOP_ACCOUNTS_LIMIT),
        }
    }
}

impl OutputOptions {
    pub fn limit_for(&self, kind: ArtifactKind) -> QueryLimit {
        match kind {
            ArtifactKind::TopRepositories => self.top_repositories,
            ArtifactKind::DailyTrending
            | ArtifactKind::WeeklyTrending
            | ArtifactKind::MonthlyTrending => self.trending,
            ArtifactKind::TopAccounts => self.top_accounts,
        }
    }

    pub fn artifact_path(&self, kind: ArtifactKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }
}

// ─── Wire Format ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_repos_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_users_count: Option<usize>,
    pub order_by: String,
    pub order_direction: String,
    pub repos_total_count: i64,
    pub user_total_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryItem {
    pub database_id: i64,
    pub id: String,
    pub name: String,
    pub url: String,
    pub language: Vec<String>,
    pub description: Option<String>,
    pub accumulated_stars: i64,
    #[serde(rename = "accumulatedStars_1d")]
    pub accumulated_stars_1d: Option<i64>,
    #[serde(rename = "accumulatedStars_7d")]
    pub accumulated_stars_7d: Option<i64>,
    #[serde(rename = "accumulatedStars_30d")]
    pub accumulated_stars_30d: Option<i64>,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<RepositoryModel> for RepositoryItem {
    fn from(model: RepositoryModel) -> Self {
        Self {
            language: model.language_names(),
            database_id: model.id,
            id: model.node_id,
            name: model.name,
            url: model.url,
            description: model.description,
            accumulated_stars: model.stars,
            accumulated_stars_1d: model.stars_1d,
            accumulated_stars_7d: model.stars_7d,
            accumulated_stars_30d: model.stars_30d,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountItem {
    pub database_id: i64,
    pub id: String,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: String,
    pub url: String,
    pub followers_count: i64,
    pub top_repositories_stars: i64,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<AccountModel> for AccountItem {
    fn from(model: AccountModel) -> Self {
        Self {
            database_id: model.id,
            id: model.node_id,
            login: model.login,
            name: model.name,
            avatar_url: model.avatar_url,
            url: model.url,
            followers_count: model.followers,
            top_repositories_stars: model.top_repo_stars,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryArtifact {
    pub meta: ArtifactMeta,
    pub top_repos: Vec<RepositoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountArtifact {
    pub meta: ArtifactMeta,
    pub top_users: Vec<AccountItem>,
}

/// Catalogue-wide totals copied into every artifact's meta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogueTotals {
    pub repositories: i64,
    pub accounts: i64,
}

// ─── Generation ──────────────────────────────────────────────────────────────

/// One artifact written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub items: usize,
}

/// Outcome of [`generate_all`]: every task either wrote its file or failed alone.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub written: Vec<WrittenArtifact>,
    pub failed: Vec<(ArtifactKind, ArtifactError)>,
}

impl GenerationReport {
    pub fn all_failed(&self) -> bool {
        self.written.is_empty() && !self.failed.is_empty()
    }
}

/// Query, encode and write one artifact.
pub async fn generate(
    db: &DatabaseConnection,
    options: &OutputOptions,
    kind: ArtifactKind,
    totals: CatalogueTotals,
    now: DateTime<Utc>,
) -> Result<WrittenArtifact> {
    let limit = options.limit_for(kind);
    let mut meta = ArtifactMeta {
        updated_at: now.format(UPDATED_AT_FORMAT).to_string(),
        top_repos_count: None,
        top_users_count: None,
        order_by: kind.order_by().to_string(),
        order_direction: "desc".to_string(),
        repos_total_count: totals.repositories,
        user_total_count: totals.accounts,
    };

    let (bytes, items) = match kind.ranking() {
        Ranking::Repositories(metric) => {
            let rows = store::top_repositories(db, metric, limit).await?;
            let top_repos: Vec<RepositoryItem> = rows.into_iter().map(Into::into).collect();
            meta.top_repos_count = Some(top_repos.len());
            let items = top_repos.len();
            let bytes = serde_json::to_vec_pretty(&RepositoryArtifact { meta, top_repos })?;
            (bytes, items)
        }
        Ranking::Accounts(metric) => {
            let rows = store::top_accounts(db, metric, limit).await?;
            let top_users: Vec<AccountItem> = rows.into_iter().map(Into::into).collect();
            meta.top_users_count = Some(top_users.len());
            let items = top_users.len();
            let bytes = serde_json::to_vec_pretty(&AccountArtifact { meta, top_users })?;
            (bytes, items)
        }
    };

    let path = options.artifact_path(kind);
    write_atomically(&path, &bytes)?;
    tracing::info!(artifact = %kind, items, path = %path.display(), "Generated artifact");

    Ok(WrittenArtifact { kind, path, items })
}

/// Generate every artifact. A failing task is logged and recorded; the rest still run.
///
/// Totals come from today's counters row; a missing row or read failure yields zeros.
pub async fn generate_all(
    db: &DatabaseConnection,
    options: &OutputOptions,
    now: DateTime<Utc>,
) -> GenerationReport {
    let totals = match store::counters_for(db, now.date_naive()).await {
        Ok(Some(row)) => CatalogueTotals {
            repositories: row.total_repositories.unwrap_or(0),
            accounts: row.total_accounts.unwrap_or(0),
        },
        Ok(None) => CatalogueTotals::default(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read today's totals, using zeros");
            CatalogueTotals::default()
        }
    };

    if let Err(e) = fs::create_dir_all(&options.data_dir) {
        let err = ArtifactError::io(&options.data_dir, e);
        tracing::error!(error = %err, "Cannot create data directory");
        return GenerationReport {
            written: Vec::new(),
            failed: vec![(ArtifactKind::TopRepositories, err)],
        };
    }

    let mut report = GenerationReport::default();
    for kind in ArtifactKind::ALL {
        match generate(db, options, kind, totals, now).await {
            Ok(written) => report.written.push(written),
            Err(e) => {
                tracing::error!(artifact = %kind, error = %e, "Failed to generate artifact");
                report.failed.push((kind, e));
            }
        }
    }
    report
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(|e| ArtifactError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        ArtifactError::io(path, e)
    })
}
