//! The daily run: fetch rankings, derive growth, publish and archive.
//!
//! Stages run once each, in order:
//!
//! 1. initialize storage (data directory, schema)
//! 2. fetch repositories and accounts into the snapshot store
//! 3. compute 1, 7 and 30 day star growth against archived snapshots
//! 4. generate the JSON artifacts
//! 5. archive today's artifacts, rebuild the index, record the run time
//! 6. verify the store size
//!
//! The first failing stage halts the run; the returned [`PipelineError`]
//! names it. Artifact tasks fail independently, and the stage only fails
//! when none of them succeeds.

mod error;
mod types;

use std::fs;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;

use crate::archive::ArchiveManager;
use crate::artifact;
use crate::delta;
use crate::github::{GitHubClient, StoreSink};
use crate::migration::Migrator;
use crate::store::{self, CountersUpdate};

pub use error::{PipelineError, Result, StageError};
pub use types::{
    DEFAULT_ACCOUNT_LIMIT, DEFAULT_ACCOUNT_PAGE_SIZE, DEFAULT_DATABASE_URL,
    DEFAULT_STORE_SIZE_WARN_BYTES, FetchPlan, PipelineOptions, RunReport, Stage,
};

type StageResult<T> = std::result::Result<T, StageError>;

pub struct Pipeline {
    options: PipelineOptions,
    client: GitHubClient,
}

impl Pipeline {
    /// Build a pipeline with the default HTTP transport.
    pub fn new(options: PipelineOptions) -> Result<Self> {
        let client = GitHubClient::new(options.client.clone())
            .map_err(|e| PipelineError::new(Stage::InitializeStorage, e))?;
        Ok(Self { options, client })
    }

    pub fn with_client(options: PipelineOptions, client: GitHubClient) -> Self {
        Self { options, client }
    }

    pub fn archive(&self) -> ArchiveManager {
        ArchiveManager::new(&self.options.output.data_dir)
    }

    /// Connect to the configured store and run every stage as of now.
    pub async fn run(&self) -> Result<RunReport> {
        let db = crate::connect(&self.options.database_url)
            .await
            .map_err(|e| PipelineError::new(Stage::InitializeStorage, e))?;
        self.run_with(&db, Utc::now()).await
    }

    /// Run every stage against `db`, dating the run `now`.
    pub async fn run_with(
        &self,
        db: &DatabaseConnection,
        now: DateTime<Utc>,
    ) -> Result<RunReport> {
        let today = now.date_naive();
        let mut report = RunReport::default();
        tracing::info!(%today, skip_fetch = self.options.skip_fetch, "Starting run");

        self.initialize_storage(db)
            .await
            .map_err(|e| PipelineError::new(Stage::InitializeStorage, e))?;
        report.completed.push(Stage::InitializeStorage);

        if self.options.skip_fetch {
            tracing::info!("Skipping fetch, reusing stored snapshot");
        } else {
            self.fetch(db, today, &mut report)
                .await
                .map_err(|e| PipelineError::new(Stage::Fetch, e))?;
            report.completed.push(Stage::Fetch);
        }

        report.deltas = delta::compute_all(db, &self.archive(), today)
            .await
            .map_err(|e| PipelineError::new(Stage::ComputeDeltas, e))?;
        report.completed.push(Stage::ComputeDeltas);

        self.generate_artifacts(db, now, &mut report)
            .await
            .map_err(|e| PipelineError::new(Stage::GenerateArtifacts, e))?;
        report.completed.push(Stage::GenerateArtifacts);

        self.archive_artifacts(today, now, &mut report)
            .map_err(|e| PipelineError::new(Stage::Archive, e))?;
        report.completed.push(Stage::Archive);

        self.verify_store(db, &mut report)
            .await
            .map_err(|e| PipelineError::new(Stage::VerifyStore, e))?;
        report.completed.push(Stage::VerifyStore);

        tracing::info!(
            repositories = report.repository_count,
            accounts = report.account_count,
            artifacts = report.artifacts.len(),
            "Run complete"
        );
        Ok(report)
    }

    // ─── Stages ──────────────────────────────────────────────────────────────

    #[tracing::instrument(skip_all)]
    async fn initialize_storage(&self, db: &DatabaseConnection) -> StageResult<()> {
        let data_dir = &self.options.output.data_dir;
        fs::create_dir_all(data_dir).map_err(|source| StageError::Io {
            path: data_dir.clone(),
            source,
        })?;
        Migrator::up(db, None).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn fetch(
        &self,
        db: &DatabaseConnection,
        today: NaiveDate,
        report: &mut RunReport,
    ) -> StageResult<()> {
        let plan = &self.options.fetch;
        let mut sink = StoreSink::new(db);

        let repositories = self
            .client
            .fetch_all(
                &plan.repository_search,
                plan.repositories,
                plan.repository_page_size,
                &mut sink,
            )
            .await?;
        store::record_counters(
            db,
            today,
            CountersUpdate {
                total_repositories: repositories.total.map(saturating_i64),
                fetched_repositories: Some(saturating_i64(repositories.fetched)),
                ..Default::default()
            },
        )
        .await?;
        report.repositories = Some(repositories);

        let accounts = self
            .client
            .fetch_all(
                &plan.account_search,
                plan.accounts,
                plan.account_page_size,
                &mut sink,
            )
            .await?;
        store::record_counters(
            db,
            today,
            CountersUpdate {
                total_accounts: accounts.total.map(saturating_i64),
                fetched_accounts: Some(saturating_i64(accounts.fetched)),
                ..Default::default()
            },
        )
        .await?;
        report.accounts = Some(accounts);

        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn generate_artifacts(
        &self,
        db: &DatabaseConnection,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) -> StageResult<()> {
        let generated = artifact::generate_all(db, &self.options.output, now).await;
        if generated.all_failed() {
            return Err(StageError::Artifacts {
                failed: generated.failed.len(),
            });
        }
        report.artifact_failures = generated
            .failed
            .into_iter()
            .map(|(kind, e)| (kind, e.to_string()))
            .collect();
        report.artifacts = generated.written;
        Ok(())
    }

    /// Only artifacts written by this run are archived.
    #[tracing::instrument(skip_all)]
    fn archive_artifacts(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) -> StageResult<()> {
        let archive = self.archive();
        let kinds: Vec<_> = report.artifacts.iter().map(|w| w.kind).collect();

        report.archived = archive.archive(&kinds, today)?;
        report.indexed_days = archive.rebuild_index()?.len();
        archive.record_run_time(now)?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn verify_store(
        &self,
        db: &DatabaseConnection,
        report: &mut RunReport,
    ) -> StageResult<()> {
        report.store_size_bytes = store::store_size_bytes(db).await?;
        report.repository_count = store::count_repositories(db).await?;
        report.account_count = store::count_accounts(db).await?;

        match report.store_size_bytes {
            Some(bytes) if bytes > self.options.store_size_warn_bytes => {
                tracing::warn!(
                    size_mb = bytes / (1024 * 1024),
                    limit_mb = self.options.store_size_warn_bytes / (1024 * 1024),
                    "Store size exceeds limit"
                );
            }
            Some(bytes) => {
                tracing::info!(size_kb = bytes / 1024, "Store size within limit");
            }
            None => tracing::debug!("Store size not available for this backend"),
        }
        tracing::info!(
            repositories = report.repository_count,
            accounts = report.account_count,
            "Store row counts"
        );
        Ok(())
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::artifact::{AccountArtifact, ArtifactKind, RepositoryArtifact};
    use crate::github::test_support::{instant_options, json_response, repository_page};
    use crate::github::StopReason;
    use crate::http::MockTransport;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;

    const URL: &str = "https://api.test/graphql";

    fn account_page(total: i64, ids: &[i64]) -> serde_json::Value {
        let edges: Vec<_> = ids
            .iter()
            .map(|id| {
                json!({
                    "cursor": format!("user-cursor-{id}"),
                    "node": {
                        "databaseId": id,
                        "id": format!("U_{id}"),
                        "login": format!("user{id}"),
                        "name": null,
                        "url": format!("https://github.com/user{id}"),
                        "avatarUrl": format!("https://avatars.githubusercontent.com/u/{id}"),
                        "followers": {"totalCount": 10_000 / id},
                        "topRepositories": {
                            "nodes": [{"stargazerCount": 5}, {"stargazerCount": 7}]
                        }
                    }
                })
            })
            .collect();
        json!({"data": {"search": {"userCount": total, "edges": edges}}})
    }

    fn pipeline(transport: &MockTransport, data_dir: &std::path::Path) -> Pipeline {
        let options = PipelineOptions {
            database_url: "sqlite::memory:".to_string(),
            client: instant_options(URL),
            output: artifact::OutputOptions {
                data_dir: data_dir.to_path_buf(),
                ..Default::default()
            },
            ..Default::default()
        };
        let client = GitHubClient::new_with_transport(
            options.client.clone(),
            Arc::new(transport.clone()),
        );
        Pipeline::with_client(options, client)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 2, 0, 15, 0).unwrap()
    }

    #[tokio::test]
    async fn test_full_run_publishes_and_archives() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        let repositories = json_response(200, repository_page(3, 1, 3));
        let accounts = json_response(200, account_page(2, &[1, 2]));
        transport.push_response(URL, repositories);
        transport.push_response(URL, accounts);
        let pipeline = pipeline(&transport, dir.path());

        // Yesterday's archived snapshot gives repository 1 a daily baseline.
        let archive = pipeline.archive();
        let yesterday = archive.day_dir(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        fs::create_dir_all(&yesterday).unwrap();
        fs::write(
            yesterday.join("top_repos_list.json"),
            json!({"top_repos": [{"databaseId": 1, "accumulatedStars": 999_900}]}).to_string(),
        )
        .unwrap();

        let db = crate::connect("sqlite::memory:").await.unwrap();
        let report = pipeline.run_with(&db, now()).await.unwrap();

        assert_eq!(report.completed, Stage::ALL.to_vec());
        let repos = report.repositories.as_ref().unwrap();
        assert_eq!(repos.stored, 3);
        assert_eq!(repos.stop, StopReason::Exhausted);
        assert_eq!(report.accounts.as_ref().unwrap().stored, 2);
        assert_eq!(report.repository_count, 3);
        assert_eq!(report.account_count, 2);
        assert!(report.store_size_bytes.is_some());
        assert_eq!(report.artifacts.len(), ArtifactKind::ALL.len());
        assert_eq!(report.archived.len(), ArtifactKind::ALL.len());
        assert_eq!(report.indexed_days, 2);

        let day = &report.deltas[0];
        assert!(day.snapshot_found);
        assert_eq!(day.updated, 1);

        let daily: RepositoryArtifact = serde_json::from_slice(
            &fs::read(dir.path().join("daily_trending.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(daily.top_repos.len(), 1);
        assert_eq!(daily.top_repos[0].accumulated_stars_1d, Some(99));
        assert_eq!(daily.meta.repos_total_count, 3);
        assert_eq!(daily.meta.user_total_count, 2);

        let users: AccountArtifact = serde_json::from_slice(
            &fs::read(dir.path().join("archive/2025/03/02/top_users_list.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(users.top_users[0].login, "user1");
        assert_eq!(users.top_users[0].top_repositories_stars, 12);

        assert_eq!(
            fs::read_to_string(dir.path().join("update_time.txt")).unwrap(),
            "2025-03-02 00:15:00"
        );
        let counters = store::counters_for(&db, now().date_naive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counters.fetched_repositories, Some(3));
        assert_eq!(counters.total_accounts, Some(2));
    }

    #[tokio::test]
    async fn test_fatal_fetch_error_halts_at_fetch_stage() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        transport.push_response(
            URL,
            json_response(401, json!({"message": "Bad credentials"})),
        );
        let pipeline = pipeline(&transport, dir.path());
        let db = crate::connect("sqlite::memory:").await.unwrap();

        let err = pipeline.run_with(&db, now()).await.unwrap_err();

        assert_eq!(err.stage, Stage::Fetch);
        assert!(err.to_string().contains("fetch"));
        assert!(!dir.path().join("top_repos_list.json").exists());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_skip_fetch_reuses_stored_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        let mut pipeline = pipeline(&transport, dir.path());
        pipeline.options.skip_fetch = true;
        let db = crate::connect("sqlite::memory:").await.unwrap();

        let report = pipeline.run_with(&db, now()).await.unwrap();

        assert!(!report.completed.contains(&Stage::Fetch));
        assert!(report.repositories.is_none());
        assert!(transport.requests().is_empty());
        assert_eq!(report.artifacts.len(), ArtifactKind::ALL.len());
        assert!(report.deltas.iter().all(|d| !d.snapshot_found));
    }
}
