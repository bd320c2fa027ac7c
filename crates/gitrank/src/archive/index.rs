use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ArchiveError, Result};

/// `date → (artifact stem → path relative to the data directory)`.
///
/// Dates are `YYYY-MM-DD` and paths always use `/`, so the serialized index is
/// identical across platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveIndex(BTreeMap<String, BTreeMap<String, String>>);

impl ArchiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&BTreeMap<String, String>> {
        self.0.get(&date_key(date))
    }

    pub fn get(&self, date: NaiveDate, stem: &str) -> Option<&str> {
        self.day(date)?.get(stem).map(String::as_str)
    }

    /// Replace everything recorded for `date`.
    pub fn set_day(&mut self, date: NaiveDate, entries: BTreeMap<String, String>) {
        self.0.insert(date_key(date), entries);
    }

    /// Parse an index file. `Ok(None)` when it does not exist.
    pub(crate) fn read(path: &Path) -> Result<Option<Self>> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ArchiveError::io(path, e)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| ArchiveError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }

    pub(crate) fn write(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, bytes).map_err(|e| ArchiveError::io(Path::new(&tmp), e))?;
        fs::rename(&tmp, path).map_err(|e| ArchiveError::io(path, e))
    }
}

pub(crate) fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse `YYYY`/`MM`/`DD` directory names into a real calendar date.
pub(crate) fn parse_day_components(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let all_digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(year, 4) || !all_digits(month, 2) || !all_digits(day, 2) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_components_must_form_a_real_date() {
        assert_eq!(
            parse_day_components("2025", "02", "28"),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(parse_day_components("2025", "02", "30"), None);
        assert_eq!(parse_day_components("2025", "2", "28"), None);
        assert_eq!(parse_day_components("25", "02", "28"), None);
        assert_eq!(parse_day_components("2025", "0a", "28"), None);
    }

    #[test]
    fn test_index_serializes_as_plain_map() {
        let mut index = ArchiveIndex::new();
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        index.set_day(
            date,
            BTreeMap::from([(
                "daily_trending".to_string(),
                "archive/2025/03/01/daily_trending.json".to_string(),
            )]),
        );

        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(
            json["2025-03-01"]["daily_trending"],
            "archive/2025/03/01/daily_trending.json"
        );
        assert_eq!(
            index.get(date, "daily_trending"),
            Some("archive/2025/03/01/daily_trending.json")
        );
    }
}
