//! Per-day totals reported by the search API and counts actually fetched.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_counters")]
pub struct Model {
    /// Calendar day (UTC).
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: Date,
    /// `repositoryCount` reported by the search.
    pub total_repositories: Option<i64>,
    /// `userCount` reported by the search.
    pub total_accounts: Option<i64>,
    pub fetched_repositories: Option<i64>,
    pub fetched_accounts: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
