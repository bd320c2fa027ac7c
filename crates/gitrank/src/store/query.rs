use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

use crate::entity::account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
use crate::entity::repository::{
    Column as RepositoryColumn, Entity as Repository, Model as RepositoryModel,
};

use super::errors::Result;
use super::metric::{AccountMetric, QueryLimit, RepositoryMetric};

// ─── Ranking Queries ─────────────────────────────────────────────────────────

/// Repositories ordered by `metric` descending, ties broken by id ascending.
///
/// Rows whose growth column has never been computed are excluded when ranking
/// by a growth metric.
pub async fn top_repositories<C: ConnectionTrait>(
    db: &C,
    metric: RepositoryMetric,
    limit: QueryLimit,
) -> Result<Vec<RepositoryModel>> {
    let mut query = Repository::find();
    if metric.is_nullable() {
        query = query.filter(metric.column().is_not_null());
    }
    query = query
        .order_by_desc(metric.column())
        .order_by_asc(RepositoryColumn::Id);
    if let QueryLimit::Top(n) = limit {
        query = query.limit(n);
    }
    Ok(query.all(db).await?)
}

/// Accounts ordered by `metric` descending, ties broken by id ascending.
pub async fn top_accounts<C: ConnectionTrait>(
    db: &C,
    metric: AccountMetric,
    limit: QueryLimit,
) -> Result<Vec<AccountModel>> {
    let mut query = Account::find()
        .order_by_desc(metric.column())
        .order_by_asc(AccountColumn::Id);
    if let QueryLimit::Top(n) = limit {
        query = query.limit(n);
    }
    Ok(query.all(db).await?)
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

pub async fn find_repository<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<RepositoryModel>> {
    Ok(Repository::find_by_id(id).one(db).await?)
}

/// Current star count of every stored repository, keyed by id.
pub async fn live_repository_stars<C: ConnectionTrait>(db: &C) -> Result<HashMap<i64, i64>> {
    let rows: Vec<(i64, i64)> = Repository::find()
        .select_only()
        .column(RepositoryColumn::Id)
        .column(RepositoryColumn::Stars)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

pub async fn count_repositories<C: ConnectionTrait>(db: &C) -> Result<u64> {
    Ok(Repository::find().count(db).await?)
}

pub async fn count_accounts<C: ConnectionTrait>(db: &C) -> Result<u64> {
    Ok(Account::find().count(db).await?)
}

/// On-disk size of the store, when the backend can report one.
pub async fn store_size_bytes(db: &DatabaseConnection) -> Result<Option<u64>> {
    Ok(crate::db::database_size_bytes(db).await?)
}
