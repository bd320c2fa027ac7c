//! Repository entity - one row per ranked repository, keyed by its GitHub database id.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Repository model - the latest observed state of a ranked repository.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    /// GitHub `databaseId`. Never reassigned.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    // ─── Identity ────────────────────────────────────────────────────────────
    /// GraphQL node id.
    pub node_id: String,
    /// Repository name.
    pub name: String,
    /// Repository URL on github.com.
    #[sea_orm(column_type = "Text")]
    pub url: String,

    // ─── Content ─────────────────────────────────────────────────────────────
    /// Up to three language names, largest first (JSON array).
    #[sea_orm(column_type = "Json")]
    pub languages: serde_json::Value,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    // ─── Statistics ──────────────────────────────────────────────────────────
    /// Total stargazers at the last fetch.
    pub stars: i64,
    /// Stars gained over the trailing day, once computed.
    pub stars_1d: Option<i64>,
    /// Stars gained over the trailing week, once computed.
    pub stars_7d: Option<i64>,
    /// Stars gained over the trailing 30 days, once computed.
    pub stars_30d: Option<i64>,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    /// When the repository was created on GitHub.
    pub created_at: Option<DateTimeWithTimeZone>,
    /// When this row was last written. Never moves backwards.
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Language names as plain strings, skipping anything that is not a string.
    pub fn language_names(&self) -> Vec<String> {
        self.languages
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_language_names_ignores_non_strings() {
        let model = Model {
            id: 1,
            node_id: "R_1".to_string(),
            name: "demo".to_string(),
            url: "https://github.com/o/demo".to_string(),
            languages: serde_json::json!(["Rust", 3, "Shell"]),
            description: None,
            stars: 10,
            stars_1d: None,
            stars_7d: None,
            stars_30d: None,
            created_at: None,
            updated_at: Utc::now().fixed_offset(),
        };
        assert_eq!(model.language_names(), vec!["Rust", "Shell"]);
    }
}
