pub mod analysis;

use chrono::{DateTime, Duration, TimeZone, Utc};
use now::DateTimeNow;
use tracing::debug;

use crate::storage::{
    entities::ActivityLog, error::StorageResult, gateway::PersistenceGateway,
    key_value::KeyValueStore,
};

/// Named ranges the dashboard can be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    Today,
    Last7Days,
    Last30Days,
    AllTime,
    /// Both ends inclusive. A custom range with a missing end selects nothing.
    Custom {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

impl DateFilter {
    /// Custom range covering whole days, from the first moment of `start_day` until the last
    /// moment of `end_day`, in the days' own timezone.
    pub fn custom_days<Tz: TimeZone>(
        start_day: Option<DateTime<Tz>>,
        end_day: Option<DateTime<Tz>>,
    ) -> Self {
        DateFilter::Custom {
            start: start_day.map(|v| v.beginning_of_day().with_timezone(&Utc)),
            end: end_day.map(|v| v.end_of_day().with_timezone(&Utc)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateFilter::Today => "Today",
            DateFilter::Last7Days => "Last 7 Days",
            DateFilter::Last30Days => "Last 30 Days",
            DateFilter::AllTime => "All Time",
            DateFilter::Custom { .. } => "Custom Range",
        }
    }

    /// Loads the logs the filter covers, relative to `now`.
    pub fn select_logs<S: KeyValueStore, Tz: TimeZone>(
        &self,
        gateway: &PersistenceGateway<S>,
        now: &DateTime<Tz>,
    ) -> StorageResult<Vec<ActivityLog>> {
        let now_utc = now.with_timezone(&Utc);
        let logs = match *self {
            DateFilter::Today => gateway.get_today_logs(now)?,
            DateFilter::Last7Days => {
                gateway.get_logs_in_range(now_utc - Duration::days(7), now_utc)?
            }
            DateFilter::Last30Days => {
                gateway.get_logs_in_range(now_utc - Duration::days(30), now_utc)?
            }
            DateFilter::AllTime => gateway.get_all_logs()?,
            DateFilter::Custom {
                start: Some(start),
                end: Some(end),
            } => gateway.get_logs_in_range(start, end)?,
            DateFilter::Custom { .. } => vec![],
        };
        debug!("{} selected {} logs", self.label(), logs.len());
        Ok(logs)
    }
}
