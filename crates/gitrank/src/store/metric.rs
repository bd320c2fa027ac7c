use std::fmt;
use std::str::FromStr;

use crate::entity::account::Column as AccountColumn;
use crate::entity::repository::Column as RepositoryColumn;

use super::errors::StoreError;

// ─── Repository Metrics ──────────────────────────────────────────────────────

/// Numeric repository columns that can be ranked and written individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryMetric {
    Stars,
    Stars1d,
    Stars7d,
    Stars30d,
}

impl RepositoryMetric {
    pub const ALL: [RepositoryMetric; 4] = [
        RepositoryMetric::Stars,
        RepositoryMetric::Stars1d,
        RepositoryMetric::Stars7d,
        RepositoryMetric::Stars30d,
    ];

    const EXPECTED: &'static str = "stars, stars_1d, stars_7d, stars_30d";

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RepositoryMetric::Stars => "stars",
            RepositoryMetric::Stars1d => "stars_1d",
            RepositoryMetric::Stars7d => "stars_7d",
            RepositoryMetric::Stars30d => "stars_30d",
        }
    }

    pub(crate) fn column(self) -> RepositoryColumn {
        match self {
            RepositoryMetric::Stars => RepositoryColumn::Stars,
            RepositoryMetric::Stars1d => RepositoryColumn::Stars1d,
            RepositoryMetric::Stars7d => RepositoryColumn::Stars7d,
            RepositoryMetric::Stars30d => RepositoryColumn::Stars30d,
        }
    }

    /// Growth columns stay null until the first delta run writes them.
    #[must_use]
    pub fn is_nullable(self) -> bool {
        !matches!(self, RepositoryMetric::Stars)
    }
}

impl FromStr for RepositoryMetric {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| StoreError::unknown_field(s, Self::EXPECTED))
    }
}

impl fmt::Display for RepositoryMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Account Metrics ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountMetric {
    Followers,
    TopRepoStars,
}

impl AccountMetric {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AccountMetric::Followers => "followers",
            AccountMetric::TopRepoStars => "top_repo_stars",
        }
    }

    pub(crate) fn column(self) -> AccountColumn {
        match self {
            AccountMetric::Followers => AccountColumn::Followers,
            AccountMetric::TopRepoStars => AccountColumn::TopRepoStars,
        }
    }
}

impl FromStr for AccountMetric {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "followers" => Ok(AccountMetric::Followers),
            "top_repo_stars" => Ok(AccountMetric::TopRepoStars),
            other => Err(StoreError::unknown_field(other, "followers, top_repo_stars")),
        }
    }
}

impl fmt::Display for AccountMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many rows a ranking query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryLimit {
    All,
    Top(u64),
}

impl QueryLimit {
    /// Negative values mean "no limit", matching the configuration convention.
    #[must_use]
    pub fn from_signed(limit: i64) -> Self {
        u64::try_from(limit).map_or(QueryLimit::All, QueryLimit::Top)
    }
}
