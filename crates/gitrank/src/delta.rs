//! Star growth over trailing windows, measured against archived snapshots.
//!
//! For a window of `n` days the baseline is the top-repositories artifact
//! archived `n` days before `today`. Each repository present both in that
//! snapshot and in the store gets `live stars - archived stars` written to the
//! window's column. Growth may be negative.

use std::fmt;

use chrono::{Days, NaiveDate};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use thiserror::Error;

use crate::archive::{ArchiveError, ArchiveManager};
use crate::artifact::ArtifactKind;
use crate::store::{self, RepositoryMetric, SnapshotBatch, StoreError};

#[derive(Debug, Error)]
pub enum DeltaError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

pub type Result<T> = std::result::Result<T, DeltaError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrendWindow {
    Day,
    Week,
    Month,
}

impl TrendWindow {
    pub const ALL: [TrendWindow; 3] = [TrendWindow::Day, TrendWindow::Week, TrendWindow::Month];

    pub fn days(self) -> u64 {
        match self {
            TrendWindow::Day => 1,
            TrendWindow::Week => 7,
            TrendWindow::Month => 30,
        }
    }

    /// The column this window's growth is written to.
    pub fn metric(self) -> RepositoryMetric {
        match self {
            TrendWindow::Day => RepositoryMetric::Stars1d,
            TrendWindow::Week => RepositoryMetric::Stars7d,
            TrendWindow::Month => RepositoryMetric::Stars30d,
        }
    }

    /// The snapshot date this window compares against, if representable.
    pub fn baseline_date(self, today: NaiveDate) -> Option<NaiveDate> {
        today.checked_sub_days(Days::new(self.days()))
    }
}

impl fmt::Display for TrendWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

/// What one window's computation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaReport {
    pub window: TrendWindow,
    pub baseline: Option<NaiveDate>,
    /// `false` when no usable snapshot existed for the baseline date.
    pub snapshot_found: bool,
    pub updated: usize,
    /// Archived entries lacking an id or star count.
    pub malformed: usize,
    /// Archived ids no longer in the store.
    pub archived_only: usize,
    /// Stored ids absent from the snapshot; their column is left as is.
    pub live_only: usize,
}

impl DeltaReport {
    fn empty(window: TrendWindow, baseline: Option<NaiveDate>) -> Self {
        Self {
            window,
            baseline,
            snapshot_found: false,
            updated: 0,
            malformed: 0,
            archived_only: 0,
            live_only: 0,
        }
    }
}

/// Compute and persist one window's growth. A missing or unreadable snapshot
/// is logged and leaves the store unchanged.
pub async fn compute_window_delta(
    db: &DatabaseConnection,
    archive: &ArchiveManager,
    window: TrendWindow,
    today: NaiveDate,
) -> Result<DeltaReport> {
    let baseline = window.baseline_date(today);
    let mut report = DeltaReport::empty(window, baseline);
    let Some(baseline) = baseline else {
        return Ok(report);
    };

    let snapshot = match archive.read_snapshot(baseline, ArtifactKind::TopRepositories) {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            tracing::warn!(%window, %baseline, "No archived snapshot, skipping window");
            return Ok(report);
        }
        Err(e @ ArchiveError::Corrupt { .. }) => {
            tracing::warn!(
                %window,
                %baseline,
                error = %e,
                "Archived snapshot unreadable, skipping window"
            );
            return Ok(report);
        }
        Err(e) => return Err(e.into()),
    };
    report.snapshot_found = true;

    let (archived, malformed) = archived_stars(&snapshot);
    report.malformed = malformed;
    if malformed > 0 {
        tracing::warn!(%window, malformed, "Skipped archived entries without id or star count");
    }

    let mut live = store::live_repository_stars(db).await?;
    let metric = window.metric();
    let mut batch = SnapshotBatch::begin(db).await?;

    for (id, archived_stars) in archived {
        let Some(live_stars) = live.remove(&id) else {
            tracing::debug!(%window, id, "Archived repository not in store");
            report.archived_only += 1;
            continue;
        };
        if let Err(e) = batch
            .set_repository_metric(id, metric, live_stars - archived_stars)
            .await
        {
            batch.rollback().await?;
            return Err(e.into());
        }
    }
    report.live_only = live.len();
    report.updated = batch.commit().await?;

    if report.archived_only > 0 {
        tracing::warn!(
            %window,
            count = report.archived_only,
            "Archived repositories missing from store"
        );
    }
    if report.live_only > 0 {
        tracing::warn!(
            %window,
            count = report.live_only,
            "Stored repositories missing from snapshot"
        );
    }
    tracing::info!(
        %window,
        %baseline,
        updated = report.updated,
        column = %metric,
        "Updated star growth"
    );

    Ok(report)
}

/// Run every window in order, stopping at the first storage failure.
pub async fn compute_all(
    db: &DatabaseConnection,
    archive: &ArchiveManager,
    today: NaiveDate,
) -> Result<Vec<DeltaReport>> {
    let mut reports = Vec::with_capacity(TrendWindow::ALL.len());
    for window in TrendWindow::ALL {
        reports.push(compute_window_delta(db, archive, window, today).await?);
    }
    Ok(reports)
}

/// `(id, accumulatedStars)` pairs from a `top_repos` snapshot, plus the count
/// of entries missing either field.
fn archived_stars(snapshot: &Value) -> (Vec<(i64, i64)>, usize) {
    let Some(items) = snapshot.get("top_repos").and_then(Value::as_array) else {
        return (Vec::new(), 0);
    };

    let mut pairs = Vec::with_capacity(items.len());
    let mut malformed = 0;
    for item in items {
        let id = item.get("databaseId").and_then(Value::as_i64);
        let stars = item.get("accumulatedStars").and_then(Value::as_i64);
        match (id, stars) {
            (Some(id), Some(stars)) => pairs.push((id, stars)),
            _ => malformed += 1,
        }
    }
    (pairs, malformed)
}
