//! GitHub API error types.

use thiserror::Error;

use crate::http::HttpError;
use crate::retry::RetryError;
use crate::store::StoreError;

/// Errors that can occur when talking to the GitHub GraphQL API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("GitHub API returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Rate limit cooldown abandoned after {waits} waits")]
    RateLimitWaitsExhausted { waits: u32 },

    #[error("Response body ended early: {0}")]
    Truncated(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("Invalid request: {0}")]
    Request(String),

    #[error("Gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<GitHubError>,
    },
}

impl GitHubError {
    /// Whether the error belongs to the retryable class: network-level
    /// failures, truncated bodies and 5xx responses.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            GitHubError::Http(e) => e.is_transient(),
            GitHubError::Status { status, .. } => *status >= 500,
            GitHubError::Truncated(_) => true,
            _ => false,
        }
    }
}

impl From<RetryError<GitHubError>> for GitHubError {
    fn from(err: RetryError<GitHubError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, source } => GitHubError::RetriesExhausted {
                attempts,
                source: Box::new(source),
            },
            RetryError::Fatal(e) => e,
        }
    }
}

/// Errors that abort a paginated fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error("Failed to persist fetched page: {0}")]
    Store(#[from] StoreError),
}

/// Shorten an error message for single-line log output.
pub fn short_error_message(err: &GitHubError) -> String {
    const MAX: usize = 120;
    let message = err.to_string();
    let first_line = message.lines().next().unwrap_or_default();
    if first_line.chars().count() > MAX {
        let cut: String = first_line.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        first_line.to_string()
    }
}
