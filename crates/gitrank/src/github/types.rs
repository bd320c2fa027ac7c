//! GraphQL wire types for the GitHub search API.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Request envelope posted to the GraphQL endpoint.
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: V,
}

/// Response envelope. GitHub may return `data` and `errors` together.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlErrorEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl GraphQlErrorEntry {
    pub fn is_rate_limit(&self) -> bool {
        self.kind.as_deref() == Some("RATE_LIMITED")
    }
}

// ─── Search Connection ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConnection {
    pub repository_count: Option<i64>,
    pub user_count: Option<i64>,
    /// Raw edges, decoded one at a time so a bad edge never fails the page.
    #[serde(default)]
    pub edges: Vec<serde_json::Value>,
}

/// One search hit.
#[derive(Debug, Deserialize)]
pub struct SearchEdge {
    pub cursor: Option<String>,
    pub node: Option<serde_json::Value>,
}

// ─── Nodes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub database_id: i64,
    pub id: String,
    pub name: String,
    pub url: String,
    pub languages: Option<NodeList<NamedNode>>,
    pub stargazer_count: i64,
    pub description: Option<String>,
    pub created_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNode {
    pub database_id: i64,
    pub id: String,
    pub login: String,
    pub name: Option<String>,
    pub url: String,
    pub avatar_url: String,
    pub followers: TotalCount,
    pub top_repositories: Option<NodeList<StarredNode>>,
}

#[derive(Debug, Deserialize)]
pub struct NodeList<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<Option<T>>,
}

#[derive(Debug, Deserialize)]
pub struct NamedNode {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarredNode {
    pub stargazer_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: i64,
}
