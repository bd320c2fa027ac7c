//! The two ranking searches: repositories by stars, users by followers.

use serde_json::{Value, json};

use crate::records::{AccountRecord, RepositoryRecord};

use super::convert::{account_from_node, repository_from_node};
use super::types::SearchConnection;

/// Default search string for repositories.
pub const REPOSITORY_QUERY: &str = "stars:>0 sort:stars-desc";

/// Default search string for accounts.
pub const ACCOUNT_QUERY: &str = "type:user followers:>0 sort:followers-desc";

/// How many of an account's repositories count toward its star total.
pub const DEFAULT_TOP_REPOSITORIES: u32 = 10;

const SEARCH_REPOSITORIES: &str = r#"
query searchRepositories($queryString: String!, $first: Int!, $after: String) {
  search(query: $queryString, type: REPOSITORY, first: $first, after: $after) {
    repositoryCount
    edges {
      cursor
      node {
        ... on Repository {
          databaseId
          id
          name
          url
          languages(first: 3, orderBy: {field: SIZE, direction: DESC}) {
            nodes { name }
          }
          stargazerCount
          description
          createdAt
        }
      }
    }
  }
}
"#;

const SEARCH_USERS: &str = r#"
query searchUsers($queryString: String!, $first: Int!, $after: String, $topRepositories: Int!) {
  search(query: $queryString, type: USER, first: $first, after: $after) {
    userCount
    edges {
      cursor
      node {
        ... on User {
          databaseId
          id
          login
          name
          url
          avatarUrl
          followers { totalCount }
          topRepositories(first: $topRepositories, orderBy: {field: STARGAZERS, direction: DESC}) {
            nodes { stargazerCount }
          }
        }
      }
    }
  }
}
"#;

/// A cursor-paginated GraphQL search whose nodes decode into `Item`.
pub trait SearchKind: Send + Sync {
    type Item: Send;

    /// Short name for logs.
    fn label(&self) -> &'static str;

    /// The GraphQL document.
    fn document(&self) -> &'static str;

    /// Variables for one page request.
    fn variables(&self, first: u32, after: Option<&str>) -> Value;

    /// The total hit count this search reports.
    fn total(&self, connection: &SearchConnection) -> Option<i64>;

    /// Decode one node, or describe why it cannot be used.
    fn decode(&self, node: Value) -> Result<Self::Item, String>;
}

/// Repositories ranked by stargazer count.
#[derive(Debug, Clone)]
pub struct RepositorySearch {
    pub query: String,
}

impl Default for RepositorySearch {
    fn default() -> Self {
        Self {
            query: REPOSITORY_QUERY.to_string(),
        }
    }
}

impl SearchKind for RepositorySearch {
    type Item = RepositoryRecord;

    fn label(&self) -> &'static str {
        "repositories"
    }

    fn document(&self) -> &'static str {
        SEARCH_REPOSITORIES
    }

    fn variables(&self, first: u32, after: Option<&str>) -> Value {
        json!({
            "queryString": self.query,
            "first": first,
            "after": after,
        })
    }

    fn total(&self, connection: &SearchConnection) -> Option<i64> {
        connection.repository_count
    }

    fn decode(&self, node: Value) -> Result<RepositoryRecord, String> {
        repository_from_node(node)
    }
}

/// User accounts ranked by follower count.
#[derive(Debug, Clone)]
pub struct AccountSearch {
    pub query: String,
    /// Repositories per account summed into its star total.
    pub top_repositories: u32,
}

impl Default for AccountSearch {
    fn default() -> Self {
        Self {
            query: ACCOUNT_QUERY.to_string(),
            top_repositories: DEFAULT_TOP_REPOSITORIES,
        }
    }
}

impl SearchKind for AccountSearch {
    type Item = AccountRecord;

    fn label(&self) -> &'static str {
        "accounts"
    }

    fn document(&self) -> &'static str {
        SEARCH_USERS
    }

    fn variables(&self, first: u32, after: Option<&str>) -> Value {
        json!({
            "queryString": self.query,
            "first": first,
            "after": after,
            "topRepositories": self.top_repositories,
        })
    }

    fn total(&self, connection: &SearchConnection) -> Option<i64> {
        connection.user_count
    }

    fn decode(&self, node: Value) -> Result<AccountRecord, String> {
        account_from_node(node)
    }
}
