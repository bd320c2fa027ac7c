//! GitHub GraphQL search client.
//!
//! # Module Structure
//!
//! - [`error`] - Error types and transient-failure classification
//! - [`types`] - GraphQL request/response wire types
//! - [`search`] - The repository and account searches
//! - [`client`] - Request pacing, retry and rate-limit cooldown
//! - [`pagination`] - Cursor pagination feeding a [`BatchSink`]
//! - [`convert`] - Node to record conversion
//!
//! ```ignore
//! use gitrank::github::{ClientOptions, FetchTarget, GitHubClient, RepositorySearch, StoreSink};
//!
//! let client = GitHubClient::new(ClientOptions { token: Some(token), ..Default::default() })?;
//! let mut sink = StoreSink::new(&db);
//! let summary = client
//!     .fetch_all(&RepositorySearch::default(), FetchTarget::Unbounded, 100, &mut sink)
//!     .await?;
//! ```

mod client;
mod convert;
mod error;
mod pagination;
mod search;
mod types;

pub use client::{ClientOptions, GITHUB_GRAPHQL_URL, GitHubClient, MAX_PAGE_SIZE, SearchPage};
pub use convert::{account_from_node, repository_from_node};
pub use error::{FetchError, GitHubError, short_error_message};
pub use pagination::{BatchSink, FetchSummary, FetchTarget, StopReason, StoreSink};
pub use search::{
    ACCOUNT_QUERY, AccountSearch, DEFAULT_TOP_REPOSITORIES, REPOSITORY_QUERY, RepositorySearch,
    SearchKind,
};
pub use types::SearchConnection;

#[cfg(test)]
pub(crate) use client::test_support;
