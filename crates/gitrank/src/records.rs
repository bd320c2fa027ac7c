//! Platform-neutral snapshot records handed from the fetcher to the store.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One repository as observed by a search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// GitHub `databaseId`.
    pub id: i64,
    pub node_id: String,
    pub name: String,
    pub url: String,
    /// Up to three language names, largest first.
    pub languages: Vec<String>,
    pub description: Option<String>,
    pub stars: i64,
    pub created_at: Option<DateTime<FixedOffset>>,
}

/// One account as observed by a search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// GitHub `databaseId`.
    pub id: i64,
    pub node_id: String,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: String,
    pub url: String,
    pub followers: i64,
    /// Stargazers summed over the account's top repositories.
    pub top_repo_stars: i64,
}
