//! Account entity - ranked GitHub users.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// GitHub `databaseId`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    // ─── Identity ────────────────────────────────────────────────────────────
    pub node_id: String,
    pub login: String,
    pub name: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub avatar_url: String,
    #[sea_orm(column_type = "Text")]
    pub url: String,

    // ─── Statistics ──────────────────────────────────────────────────────────
    pub followers: i64,
    /// Sum of stargazers over the account's top repositories at fetch time.
    pub top_repo_stars: i64,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
