//! Snapshot store: transactional upserts and ranking queries over the
//! repository, account and daily-counter tables.
//!
//! Every write goes through a [`SnapshotBatch`], so a page of search results
//! lands completely or not at all.

mod batch;
mod counters;
mod errors;
mod metric;
mod query;

pub use batch::{SnapshotBatch, update_repository_field, upsert_accounts, upsert_repositories};
pub use counters::{CountersUpdate, counters_for, record_counters};
pub use errors::{Result, StoreError};
pub use metric::{AccountMetric, QueryLimit, RepositoryMetric};
pub use query::{
    count_accounts, count_repositories, find_repository, live_repository_stars,
    store_size_bytes, top_accounts, top_repositories,
};
