//! Pipeline options, stages and the run report.

use std::fmt;
use std::path::PathBuf;

use crate::artifact::{ArtifactKind, OutputOptions, WrittenArtifact};
use crate::delta::DeltaReport;
use crate::github::{
    AccountSearch, ClientOptions, FetchSummary, FetchTarget, MAX_PAGE_SIZE, RepositorySearch,
};

/// Store size above which verification logs a warning (100 MiB).
pub const DEFAULT_STORE_SIZE_WARN_BYTES: u64 = 100 * 1024 * 1024;

/// Accounts per search page. Each account node carries its top repositories,
/// which keeps pages small.
pub const DEFAULT_ACCOUNT_PAGE_SIZE: u32 = 25;

/// Accounts fetched per run.
pub const DEFAULT_ACCOUNT_LIMIT: u64 = 1000;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://gitrank.db?mode=rwc";

/// The ordered stages of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    InitializeStorage,
    Fetch,
    ComputeDeltas,
    GenerateArtifacts,
    Archive,
    VerifyStore,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::InitializeStorage,
        Stage::Fetch,
        Stage::ComputeDeltas,
        Stage::GenerateArtifacts,
        Stage::Archive,
        Stage::VerifyStore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::InitializeStorage => "initialize-storage",
            Stage::Fetch => "fetch",
            Stage::ComputeDeltas => "compute-deltas",
            Stage::GenerateArtifacts => "generate-artifacts",
            Stage::Archive => "archive",
            Stage::VerifyStore => "verify-store",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the fetch stage asks GitHub for.
#[derive(Debug, Clone)]
pub struct FetchPlan {
    pub repository_search: RepositorySearch,
    pub repositories: FetchTarget,
    pub repository_page_size: u32,
    pub account_search: AccountSearch,
    pub accounts: FetchTarget,
    pub account_page_size: u32,
}

impl Default for FetchPlan {
    fn default() -> Self {
        Self {
            repository_search: RepositorySearch::default(),
            repositories: FetchTarget::Unbounded,
            repository_page_size: MAX_PAGE_SIZE,
            account_search: AccountSearch::default(),
            accounts: FetchTarget::Limit(DEFAULT_ACCOUNT_LIMIT),
            account_page_size: DEFAULT_ACCOUNT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Connection string for the snapshot store.
    pub database_url: String,
    pub client: ClientOptions,
    pub fetch: FetchPlan,
    pub output: OutputOptions,
    /// Reuse the stored snapshot instead of querying GitHub.
    pub skip_fetch: bool,
    pub store_size_warn_bytes: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            client: ClientOptions::default(),
            fetch: FetchPlan::default(),
            output: OutputOptions::default(),
            skip_fetch: false,
            store_size_warn_bytes: DEFAULT_STORE_SIZE_WARN_BYTES,
        }
    }
}

/// Everything a run did, stage by stage.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub completed: Vec<Stage>,
    pub repositories: Option<FetchSummary>,
    pub accounts: Option<FetchSummary>,
    pub deltas: Vec<DeltaReport>,
    pub artifacts: Vec<WrittenArtifact>,
    /// Artifact tasks that failed while others succeeded.
    pub artifact_failures: Vec<(ArtifactKind, String)>,
    pub archived: Vec<PathBuf>,
    pub indexed_days: usize,
    pub store_size_bytes: Option<u64>,
    pub repository_count: u64,
    pub account_count: u64,
}
