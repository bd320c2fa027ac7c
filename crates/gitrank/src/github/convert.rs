//! Conversion from GraphQL search nodes to snapshot records.

use serde_json::Value;

use crate::records::{AccountRecord, RepositoryRecord};

use super::types::{RepositoryNode, UserNode};

/// Decode a repository search node. Returns a description of the problem
/// for nodes that are missing required fields.
pub fn repository_from_node(node: Value) -> Result<RepositoryRecord, String> {
    let node: RepositoryNode = serde_json::from_value(node).map_err(|e| e.to_string())?;

    let languages = node
        .languages
        .map(|list| list.nodes.into_iter().flatten().map(|l| l.name).collect())
        .unwrap_or_default();

    Ok(RepositoryRecord {
        id: node.database_id,
        node_id: node.id,
        name: node.name,
        url: node.url,
        languages,
        description: node.description.filter(|d| !d.is_empty()),
        stars: node.stargazer_count,
        created_at: node.created_at,
    })
}

/// Decode a user search node, summing stargazers over its top repositories.
pub fn account_from_node(node: Value) -> Result<AccountRecord, String> {
    let node: UserNode = serde_json::from_value(node).map_err(|e| e.to_string())?;

    let top_repo_stars = node
        .top_repositories
        .map(|list| {
            list.nodes
                .into_iter()
                .flatten()
                .map(|r| r.stargazer_count)
                .sum()
        })
        .unwrap_or(0);

    Ok(AccountRecord {
        id: node.database_id,
        node_id: node.id,
        login: node.login,
        name: node.name.filter(|n| !n.is_empty()),
        avatar_url: node.avatar_url,
        url: node.url,
        followers: node.followers.total_count,
        top_repo_stars,
    })
}
