use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};

use crate::entity::daily_counters::{
    ActiveModel as DailyCountersActiveModel, Entity as DailyCounters, Model as DailyCountersModel,
};

use super::errors::Result;

/// Fields to set on a day's counters row. `None` leaves the stored value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersUpdate {
    pub total_repositories: Option<i64>,
    pub total_accounts: Option<i64>,
    pub fetched_repositories: Option<i64>,
    pub fetched_accounts: Option<i64>,
}

impl CountersUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Create or update the counters row for `date`, setting only the provided fields.
pub async fn record_counters(
    db: &DatabaseConnection,
    date: NaiveDate,
    update: CountersUpdate,
) -> Result<DailyCountersModel> {
    let txn = db.begin().await?;

    let model = match DailyCounters::find_by_id(date).one(&txn).await? {
        Some(existing) => {
            if update.is_empty() {
                existing
            } else {
                let mut active: DailyCountersActiveModel = existing.into();
                if let Some(v) = update.total_repositories {
                    active.total_repositories = Set(Some(v));
                }
                if let Some(v) = update.total_accounts {
                    active.total_accounts = Set(Some(v));
                }
                if let Some(v) = update.fetched_repositories {
                    active.fetched_repositories = Set(Some(v));
                }
                if let Some(v) = update.fetched_accounts {
                    active.fetched_accounts = Set(Some(v));
                }
                active.update(&txn).await?
            }
        }
        None => {
            DailyCountersActiveModel {
                date: Set(date),
                total_repositories: Set(update.total_repositories),
                total_accounts: Set(update.total_accounts),
                fetched_repositories: Set(update.fetched_repositories),
                fetched_accounts: Set(update.fetched_accounts),
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;
    tracing::debug!(%date, ?update, "Recorded daily counters");
    Ok(model)
}

pub async fn counters_for(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<Option<DailyCountersModel>> {
    Ok(DailyCounters::find_by_id(date).one(db).await?)
}
