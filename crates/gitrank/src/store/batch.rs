use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait, sea_query::Expr,
};

use crate::entity::account::{ActiveModel as AccountActiveModel, Entity as Account};
use crate::entity::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
};
use crate::records::{AccountRecord, RepositoryRecord};

use super::errors::Result;
use super::metric::RepositoryMetric;

// ─── Snapshot Batch ──────────────────────────────────────────────────────────

/// A unit of store writes that commits or rolls back as a whole.
///
/// Dropping a batch without calling [`SnapshotBatch::commit`] rolls it back.
pub struct SnapshotBatch {
    txn: DatabaseTransaction,
    now: DateTime<FixedOffset>,
    applied: usize,
}

impl SnapshotBatch {
    /// Open a transaction.
    pub async fn begin(db: &DatabaseConnection) -> Result<Self> {
        Ok(Self {
            txn: db.begin().await?,
            now: Utc::now().fixed_offset(),
            applied: 0,
        })
    }

    /// Number of writes applied so far.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Insert or update one repository by id.
    ///
    /// Growth columns are left untouched on update.
    pub async fn apply_repository(&mut self, record: &RepositoryRecord) -> Result<()> {
        let languages = serde_json::Value::from(record.languages.clone());

        match Repository::find_by_id(record.id).one(&self.txn).await? {
            Some(existing) => {
                let updated_at = existing.updated_at.max(self.now);
                let mut model: RepositoryActiveModel = existing.into();
                model.node_id = Set(record.node_id.clone());
                model.name = Set(record.name.clone());
                model.url = Set(record.url.clone());
                model.languages = Set(languages);
                model.description = Set(record.description.clone());
                model.stars = Set(record.stars);
                model.created_at = Set(record.created_at);
                model.updated_at = Set(updated_at);
                model.update(&self.txn).await?;
            }
            None => {
                let model = RepositoryActiveModel {
                    id: Set(record.id),
                    node_id: Set(record.node_id.clone()),
                    name: Set(record.name.clone()),
                    url: Set(record.url.clone()),
                    languages: Set(languages),
                    description: Set(record.description.clone()),
                    stars: Set(record.stars),
                    stars_1d: Set(None),
                    stars_7d: Set(None),
                    stars_30d: Set(None),
                    created_at: Set(record.created_at),
                    updated_at: Set(self.now),
                };
                model.insert(&self.txn).await?;
            }
        }

        self.applied += 1;
        Ok(())
    }

    /// Insert or update one account by id.
    pub async fn apply_account(&mut self, record: &AccountRecord) -> Result<()> {
        match Account::find_by_id(record.id).one(&self.txn).await? {
            Some(existing) => {
                let updated_at = existing.updated_at.max(self.now);
                let mut model: AccountActiveModel = existing.into();
                model.node_id = Set(record.node_id.clone());
                model.login = Set(record.login.clone());
                model.name = Set(record.name.clone());
                model.avatar_url = Set(record.avatar_url.clone());
                model.url = Set(record.url.clone());
                model.followers = Set(record.followers);
                model.top_repo_stars = Set(record.top_repo_stars);
                model.updated_at = Set(updated_at);
                model.update(&self.txn).await?;
            }
            None => {
                let model = AccountActiveModel {
                    id: Set(record.id),
                    node_id: Set(record.node_id.clone()),
                    login: Set(record.login.clone()),
                    name: Set(record.name.clone()),
                    avatar_url: Set(record.avatar_url.clone()),
                    url: Set(record.url.clone()),
                    followers: Set(record.followers),
                    top_repo_stars: Set(record.top_repo_stars),
                    updated_at: Set(self.now),
                };
                model.insert(&self.txn).await?;
            }
        }

        self.applied += 1;
        Ok(())
    }

    /// Write a single numeric column of one repository.
    ///
    /// Returns `false` when no row has that id.
    pub async fn set_repository_metric(
        &mut self,
        id: i64,
        metric: RepositoryMetric,
        value: i64,
    ) -> Result<bool> {
        let result = Repository::update_many()
            .col_expr(metric.column(), Expr::value(value))
            .filter(RepositoryColumn::Id.eq(id))
            .exec(&self.txn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(false);
        }
        self.applied += 1;
        Ok(true)
    }

    /// Commit every write in the batch. Returns the number of writes.
    pub async fn commit(self) -> Result<usize> {
        let applied = self.applied;
        self.txn.commit().await?;
        Ok(applied)
    }

    /// Discard every write in the batch.
    pub async fn rollback(self) -> Result<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}

// ─── Batch Helpers ───────────────────────────────────────────────────────────

/// Upsert a page of repositories in one transaction.
///
/// On any failure the whole page is rolled back and the error returned.
pub async fn upsert_repositories(
    db: &DatabaseConnection,
    records: &[RepositoryRecord],
) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut batch = SnapshotBatch::begin(db).await?;
    for record in records {
        if let Err(e) = batch.apply_repository(record).await {
            tracing::error!(id = record.id, error = %e, "Repository upsert failed, rolling back batch");
            batch.rollback().await?;
            return Err(e);
        }
    }
    let applied = batch.commit().await?;
    tracing::debug!(count = applied, "Committed repository batch");
    Ok(applied)
}

/// Upsert a page of accounts in one transaction.
pub async fn upsert_accounts(db: &DatabaseConnection, records: &[AccountRecord]) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut batch = SnapshotBatch::begin(db).await?;
    for record in records {
        if let Err(e) = batch.apply_account(record).await {
            tracing::error!(id = record.id, error = %e, "Account upsert failed, rolling back batch");
            batch.rollback().await?;
            return Err(e);
        }
    }
    let applied = batch.commit().await?;
    tracing::debug!(count = applied, "Committed account batch");
    Ok(applied)
}

/// Update one whitelisted repository column by name.
///
/// Returns `Ok(false)` and logs a warning when the repository does not exist.
///
/// # Errors
/// `StoreError::UnknownField` when `field` is not one of
/// `stars`, `stars_1d`, `stars_7d`, `stars_30d`.
pub async fn update_repository_field(
    db: &DatabaseConnection,
    id: i64,
    field: &str,
    value: i64,
) -> Result<bool> {
    let metric: RepositoryMetric = field.parse()?;

    let mut batch = SnapshotBatch::begin(db).await?;
    let updated = batch.set_repository_metric(id, metric, value).await?;
    batch.commit().await?;

    if !updated {
        tracing::warn!(id, field, "No repository with this id, nothing updated");
    }
    Ok(updated)
}
