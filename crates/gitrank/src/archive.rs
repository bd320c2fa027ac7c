//! Dated copies of the artifacts plus an index that can always be rebuilt
//! from the directory tree.
//!
//! Layout under the data directory:
//!
//! ```text
//! archive/YYYY/MM/DD/<artifact>.json
//! archive_index.json
//! update_time.txt
//! ```

mod index;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::artifact::ArtifactKind;

pub use index::ArchiveIndex;

pub const ARCHIVE_DIR: &str = "archive";
pub const INDEX_FILE: &str = "archive_index.json";
pub const UPDATE_TIME_FILE: &str = "update_time.txt";

/// Format of the run timestamp in [`UPDATE_TIME_FILE`].
pub const UPDATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unreadable JSON in {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArchiveError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Clone)]
pub struct ArchiveManager {
    data_dir: PathBuf,
}

impl ArchiveManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE)
    }

    /// `archive/YYYY/MM/DD` for `date`.
    pub fn day_dir(&self, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join(ARCHIVE_DIR)
            .join(date.format("%Y").to_string())
            .join(date.format("%m").to_string())
            .join(date.format("%d").to_string())
    }

    // ─── Archiving ───────────────────────────────────────────────────────────

    /// Copy each existing artifact into the day's directory, keeping its
    /// modification time. Missing artifacts are skipped with a warning.
    ///
    /// Returns the archived paths.
    pub fn archive(&self, kinds: &[ArtifactKind], as_of: NaiveDate) -> Result<Vec<PathBuf>> {
        let day_dir = self.day_dir(as_of);
        fs::create_dir_all(&day_dir).map_err(|e| ArchiveError::io(&day_dir, e))?;

        let mut archived = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let source = self.data_dir.join(kind.file_name());
            if !source.is_file() {
                tracing::warn!(
                    artifact = %kind,
                    path = %source.display(),
                    "Artifact missing, not archived"
                );
                continue;
            }
            let dest = day_dir.join(kind.file_name());
            copy_preserving_mtime(&source, &dest)?;
            tracing::debug!(artifact = %kind, dest = %dest.display(), "Archived artifact");
            archived.push(dest);
        }

        tracing::info!(date = %as_of, archived = archived.len(), "Archived artifacts");
        Ok(archived)
    }

    /// Write the run timestamp to [`UPDATE_TIME_FILE`].
    pub fn record_run_time(&self, now: DateTime<Utc>) -> Result<PathBuf> {
        let path = self.data_dir.join(UPDATE_TIME_FILE);
        fs::write(&path, now.format(UPDATE_TIME_FORMAT).to_string())
            .map_err(|e| ArchiveError::io(&path, e))?;
        Ok(path)
    }

    // ─── Index ───────────────────────────────────────────────────────────────

    /// The persisted index, or an empty one if it is missing or unreadable.
    pub fn load_index(&self) -> ArchiveIndex {
        match ArchiveIndex::read(&self.index_path()) {
            Ok(Some(index)) => index,
            Ok(None) => ArchiveIndex::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable archive index");
                ArchiveIndex::new()
            }
        }
    }

    /// Rescan the archive tree and persist the merged index.
    ///
    /// Every scanned date is replaced wholesale by what is on disk; dates with
    /// no directory keep their previous entry.
    pub fn rebuild_index(&self) -> Result<ArchiveIndex> {
        let mut index = self.load_index();
        let scanned = self.scan()?;
        let days = scanned.len();
        for (date, entries) in scanned {
            index.set_day(date, entries);
        }

        index.write(&self.index_path())?;
        tracing::info!(scanned_days = days, indexed_days = index.len(), "Rebuilt archive index");
        Ok(index)
    }

    fn scan(&self) -> Result<BTreeMap<NaiveDate, BTreeMap<String, String>>> {
        let root = self.data_dir.join(ARCHIVE_DIR);
        let mut days = BTreeMap::new();
        if !root.is_dir() {
            return Ok(days);
        }

        for (year, year_path) in subdirectories(&root)? {
            for (month, month_path) in subdirectories(&year_path)? {
                for (day, day_path) in subdirectories(&month_path)? {
                    let Some(date) = index::parse_day_components(&year, &month, &day) else {
                        tracing::debug!(path = %day_path.display(), "Skipping non-date directory");
                        continue;
                    };
                    let relative = format!("{ARCHIVE_DIR}/{year}/{month}/{day}");
                    days.insert(date, scan_day(&day_path, &relative)?);
                }
            }
        }
        Ok(days)
    }

    // ─── Lookup ──────────────────────────────────────────────────────────────

    /// Where the `kind` snapshot for `date` lives, consulting the index first
    /// and then the canonical path.
    pub fn snapshot_path(&self, date: NaiveDate, kind: ArtifactKind) -> Option<PathBuf> {
        let index = self.load_index();
        if let Some(relative) = index.get(date, kind.file_stem()) {
            let path = self.data_dir.join(relative);
            if path.is_file() {
                return Some(path);
            }
            tracing::debug!(path = %path.display(), "Indexed snapshot missing on disk");
        }

        let canonical = self.day_dir(date).join(kind.file_name());
        canonical.is_file().then_some(canonical)
    }

    /// Parse the `kind` snapshot for `date`. `Ok(None)` when none was archived.
    pub fn read_snapshot(
        &self,
        date: NaiveDate,
        kind: ArtifactKind,
    ) -> Result<Option<serde_json::Value>> {
        let Some(path) = self.snapshot_path(date, kind) else {
            return Ok(None);
        };
        let raw = fs::read(&path).map_err(|e| ArchiveError::io(&path, e))?;
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| ArchiveError::Corrupt { path, source })
    }
}

fn copy_preserving_mtime(source: &Path, dest: &Path) -> Result<()> {
    fs::copy(source, dest).map_err(|e| ArchiveError::io(dest, e))?;
    let modified = fs::metadata(source)
        .and_then(|meta| meta.modified())
        .map_err(|e| ArchiveError::io(source, e))?;
    fs::File::options()
        .write(true)
        .open(dest)
        .and_then(|file| file.set_modified(modified))
        .map_err(|e| ArchiveError::io(dest, e))
}

fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| ArchiveError::io(dir, e))? {
        let entry = entry.map_err(|e| ArchiveError::io(dir, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            dirs.push((name.to_string(), path));
        }
    }
    Ok(dirs)
}

/// `stem → relative path` for every `<stem>.<ext>` file in a day directory.
fn scan_day(day_path: &Path, relative_dir: &str) -> Result<BTreeMap<String, String>> {
    let mut entries = BTreeMap::new();
    for entry in fs::read_dir(day_path).map_err(|e| ArchiveError::io(day_path, e))? {
        let entry = entry.map_err(|e| ArchiveError::io(day_path, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let (Some(stem), Some(_ext), Some(name)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension(),
            path.file_name().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        entries.insert(stem.to_string(), format!("{relative_dir}/{name}"));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_dir_is_zero_padded() {
        let manager = ArchiveManager::new("/data");
        assert_eq!(
            manager.day_dir(date(2025, 3, 7)),
            PathBuf::from("/data/archive/2025/03/07")
        );
    }

    #[test]
    fn test_archive_skips_missing_artifacts_and_keeps_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArchiveManager::new(dir.path());
        let source = dir.path().join("daily_trending.json");
        fs::write(&source, br#"{"top_repos":[]}"#).unwrap();
        let old =
            std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        fs::File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let archived = manager
            .archive(
                &[ArtifactKind::DailyTrending, ArtifactKind::TopAccounts],
                date(2025, 3, 1),
            )
            .unwrap();

        assert_eq!(archived.len(), 1);
        let copied = dir.path().join("archive/2025/03/01/daily_trending.json");
        assert_eq!(archived[0], copied);
        assert_eq!(fs::metadata(&copied).unwrap().modified().unwrap(), old);
    }

    #[test]
    fn test_record_run_time_format() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArchiveManager::new(dir.path());
        let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 3, 1, 4, 5, 6).unwrap();

        let path = manager.record_run_time(now).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "2025-03-01 04:05:06");
    }

    #[test]
    fn test_snapshot_path_falls_back_to_canonical_location() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArchiveManager::new(dir.path());
        let day = manager.day_dir(date(2025, 2, 1));
        fs::create_dir_all(&day).unwrap();
        fs::write(day.join("top_repos_list.json"), b"{}").unwrap();

        assert_eq!(
            manager.snapshot_path(date(2025, 2, 1), ArtifactKind::TopRepositories),
            Some(day.join("top_repos_list.json"))
        );
        assert_eq!(
            manager.snapshot_path(date(2025, 2, 2), ArtifactKind::TopRepositories),
            None
        );
    }

    #[test]
    fn test_read_snapshot_reports_corrupt_json() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArchiveManager::new(dir.path());
        let day = manager.day_dir(date(2025, 2, 1));
        fs::create_dir_all(&day).unwrap();
        fs::write(day.join("top_repos_list.json"), b"{not json").unwrap();

        let err = manager
            .read_snapshot(date(2025, 2, 1), ArtifactKind::TopRepositories)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupt { .. }));
    }
}
