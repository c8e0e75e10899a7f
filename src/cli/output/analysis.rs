use chrono::Duration;

use crate::{
    storage::entities::{Activity, ActivityLog},
    utils::percentage::{Percentage, duration_percentage},
};

/// Sum of durations of logs for `activity`, or of every log when no activity is given.
pub fn total_duration(logs: &[ActivityLog], activity: Option<Activity>) -> Duration {
    logs.iter()
        .filter(|log| activity.map_or(true, |activity| log.activity == activity))
        .fold(Duration::zero(), |total, log| total + log.duration)
}

/// Time spent in each activity. Every activity has an entry, even the ones nobody logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakdown {
    durations: [Duration; 4],
}

impl Breakdown {
    pub fn get(&self, activity: Activity) -> Duration {
        self.durations[activity.index()]
    }

    /// Entries in [Activity::ALL] order.
    pub fn iter(&self) -> impl Iterator<Item = (Activity, Duration)> + '_ {
        Activity::ALL.into_iter().map(|activity| (activity, self.get(activity)))
    }

    pub fn total(&self) -> Duration {
        self.durations
            .iter()
            .fold(Duration::zero(), |total, duration| total + *duration)
    }

    pub fn share(&self, activity: Activity) -> Percentage {
        duration_percentage(self.get(activity), self.total())
    }
}

pub fn breakdown_by_activity(logs: &[ActivityLog]) -> Breakdown {
    let mut durations = [Duration::zero(); 4];
    for log in logs {
        durations[log.activity.index()] += log.duration;
    }
    Breakdown { durations }
}

/// Activity with the strictly largest time. On a tie the one coming first in [Activity::ALL]
/// wins. `None` when nothing has any time.
pub fn most_common_activity(breakdown: &Breakdown) -> Option<Activity> {
    let mut most_common = None;
    let mut max = Duration::zero();
    for (activity, duration) in breakdown.iter() {
        if duration > max {
            max = duration;
            most_common = Some(activity);
        }
    }
    most_common
}

/// Everything the dashboard summary shows about a set of logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_time: Duration,
    pub activity_count: usize,
    pub breakdown: Breakdown,
    pub most_common_activity: Option<Activity>,
}

impl DashboardStats {
    pub fn from_logs(logs: &[ActivityLog]) -> Self {
        let breakdown = breakdown_by_activity(logs);
        Self {
            total_time: total_duration(logs, None),
            activity_count: logs.len(),
            most_common_activity: most_common_activity(&breakdown),
            breakdown,
        }
    }
}
