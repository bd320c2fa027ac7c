//! gitrank - daily GitHub ranking snapshots.
//!
//! This library harvests the most-starred repositories and most-followed
//! accounts from the GitHub GraphQL search API, keeps the latest snapshot in a
//! relational store, derives 1/7/30 day star growth from archived snapshots,
//! and publishes ranked JSON artifacts.
//!
//! # Features
//!
//! - `sqlite` - SQLite backend for the snapshot store.
//! - `migrate` - Database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to run migrations on connection, and the
//!   [`pipeline`] module is available.
//!
//! # Example
//!
//! ```ignore
//! use gitrank::pipeline::{Pipeline, PipelineOptions};
//!
//! let pipeline = Pipeline::new(PipelineOptions::default())?;
//! let report = pipeline.run().await?;
//! println!("{} repositories stored", report.repository_count);
//! ```

pub mod archive;
pub mod artifact;
pub mod db;
pub mod delta;
pub mod entity;
pub mod github;
pub mod http;
pub mod records;
pub mod retry;
pub mod store;

#[cfg(feature = "migrate")]
pub mod migration;

#[cfg(feature = "migrate")]
pub mod pipeline;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
