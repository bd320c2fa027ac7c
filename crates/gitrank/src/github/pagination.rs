//! Cursor-driven pagination over a search until a target count or the end
//! of the result set.

use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::records::{AccountRecord, RepositoryRecord};
use crate::store::{self, StoreError};

use super::client::{GitHubClient, MAX_PAGE_SIZE};
use super::error::FetchError;
use super::search::SearchKind;

/// How many items a fetch should collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    Limit(u64),
    /// Everything the server reports; the reported total becomes the limit.
    Unbounded,
}

impl FetchTarget {
    /// Negative values mean unbounded, matching the configuration convention.
    #[must_use]
    pub fn from_signed(limit: i64) -> Self {
        u64::try_from(limit).map_or(FetchTarget::Unbounded, FetchTarget::Limit)
    }
}

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    /// The server returned no edges.
    EmptyPage,
    /// The server returned fewer edges than requested.
    Exhausted,
    /// The server handed back a cursor that was already followed.
    RepeatedCursor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    /// Edges received, including dropped ones.
    pub fetched: u64,
    /// Records handed to the sink.
    pub stored: u64,
    pub dropped: u64,
    /// Total reported by the server on the first page.
    pub total: Option<u64>,
    pub pages: u32,
    pub stop: StopReason,
}

/// Receives each decoded page before the next one is requested.
#[async_trait]
pub trait BatchSink<T>: Send {
    async fn accept(&mut self, batch: Vec<T>) -> Result<usize, StoreError>;
}

/// Writes pages into the snapshot store, one transaction per page.
pub struct StoreSink<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> StoreSink<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BatchSink<RepositoryRecord> for StoreSink<'_> {
    async fn accept(&mut self, batch: Vec<RepositoryRecord>) -> Result<usize, StoreError> {
        store::upsert_repositories(self.db, &batch).await
    }
}

#[async_trait]
impl BatchSink<AccountRecord> for StoreSink<'_> {
    async fn accept(&mut self, batch: Vec<AccountRecord>) -> Result<usize, StoreError> {
        store::upsert_accounts(self.db, &batch).await
    }
}

impl GitHubClient {
    /// Page through `search` until `target` items have been seen or the
    /// server runs out, handing each page to `sink` as it arrives.
    ///
    /// Each request asks for `min(page_size, remaining)` items. A page shorter
    /// than requested ends the fetch after it is stored.
    ///
    /// # Errors
    /// Any fatal API error, exhausted retries, or a sink failure. Pages
    /// already handed to the sink stay persisted.
    pub async fn fetch_all<S: SearchKind>(
        &self,
        search: &S,
        target: FetchTarget,
        page_size: u32,
        sink: &mut dyn BatchSink<S::Item>,
    ) -> Result<FetchSummary, FetchError> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let mut limit = match target {
            FetchTarget::Limit(n) => Some(n),
            FetchTarget::Unbounded => None,
        };

        let mut fetched = 0u64;
        let mut stored = 0u64;
        let mut dropped = 0u64;
        let mut total: Option<u64> = None;
        let mut pages = 0u32;
        let mut cursor: Option<String> = None;
        let mut followed: HashSet<String> = HashSet::new();

        tracing::info!(search = search.label(), requested = ?target, page_size, "Starting fetch");

        let stop = loop {
            if let Some(limit) = limit
                && fetched >= limit
            {
                break StopReason::TargetReached;
            }

            let want = match limit {
                Some(limit) => u32::try_from((limit - fetched).min(u64::from(page_size)))
                    .unwrap_or(page_size),
                None => page_size,
            };

            let page = self.search_page(search, want, cursor.as_deref()).await?;
            pages += 1;

            if total.is_none()
                && let Some(reported) = page.total
            {
                total = Some(reported);
                let capped = limit.map_or(reported, |l| l.min(reported));
                if limit != Some(capped) {
                    tracing::info!(search = search.label(), limit = capped, "Target set to reported total");
                    limit = Some(capped);
                }
            }

            if page.edge_count == 0 {
                tracing::warn!(
                    search = search.label(),
                    fetched,
                    "Server returned an empty page, stopping early"
                );
                break StopReason::EmptyPage;
            }

            let received = page.edge_count;
            fetched += received as u64;
            dropped += page.dropped as u64;

            if !page.items.is_empty() {
                stored += sink.accept(page.items).await? as u64;
            }

            tracing::info!(
                search = search.label(),
                fetched,
                limit,
                total,
                "Fetched {}/{} | {}",
                fetched,
                limit.map_or_else(|| "?".to_string(), |l| l.to_string()),
                total.map_or_else(|| "?".to_string(), |t| t.to_string()),
            );

            if received < want as usize {
                tracing::info!(
                    search = search.label(),
                    requested = want,
                    received,
                    "Short page, result set exhausted"
                );
                break StopReason::Exhausted;
            }

            match page.end_cursor {
                Some(next) if followed.insert(next.clone()) => cursor = Some(next),
                Some(next) => {
                    tracing::warn!(search = search.label(), cursor = %next, "Cursor repeated, stopping");
                    break StopReason::RepeatedCursor;
                }
                None => break StopReason::Exhausted,
            }
        };

        let summary = FetchSummary {
            fetched,
            stored,
            dropped,
            total,
            pages,
            stop,
        };
        tracing::info!(search = search.label(), ?summary, "Fetch finished");
        Ok(summary)
    }
}
