use std::fmt::Display;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;

/// Physical state being tracked. The set is closed and its order is fixed: every breakdown and
/// tie-break walks activities in [Activity::ALL] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Sitting,
    Standing,
    #[serde(rename = "laying down")]
    #[value(name = "laying-down", alias = "laying")]
    LayingDown,
    Walking,
}

impl Activity {
    pub const ALL: [Activity; 4] = [
        Activity::Sitting,
        Activity::Standing,
        Activity::LayingDown,
        Activity::Walking,
    ];

    /// Position of the activity inside [Activity::ALL].
    pub fn index(self) -> usize {
        match self {
            Activity::Sitting => 0,
            Activity::Standing => 1,
            Activity::LayingDown => 2,
            Activity::Walking => 3,
        }
    }
}

impl Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Activity::Sitting => write!(f, "sitting"),
            Activity::Standing => write!(f, "standing"),
            Activity::LayingDown => write!(f, "laying down"),
            Activity::Walking => write!(f, "walking"),
        }
    }
}

/// The activity currently being timed. At most one exists at a time, it lives in the store until
/// the activity is ended or cancelled.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub activity: Activity,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    /// Local calendar date of the start, `M/D/YYYY`.
    pub activity_date: String,
}

/// Completed activity. Logs are only ever appended and never changed afterwards.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub activity: Activity,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    #[serde(with = "duration_ser")]
    pub duration: Duration,
}

impl ActivityLog {
    /// Closes `session` at `end_time`. An end before the start (clock moved backwards) is pinned
    /// to the start so the log never carries a negative duration.
    pub fn complete(session: &ActiveSession, end_time: DateTime<Utc>, id: String) -> Self {
        let end_time = end_time.max(session.start_time);
        ActivityLog {
            id,
            activity: session.activity,
            start_time: session.start_time,
            end_time,
            duration: end_time - session.start_time,
        }
    }

    /// Checks the invariants serde can't express.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.end_time < self.start_time {
            return Err(format!(
                "log {} ends at {} before it starts at {}",
                self.id, self.end_time, self.start_time
            ));
        }
        if self.duration != self.end_time - self.start_time {
            return Err(format!(
                "log {} has duration {}ms but spans {}ms",
                self.id,
                self.duration.num_milliseconds(),
                (self.end_time - self.start_time).num_milliseconds()
            ));
        }
        Ok(())
    }
}

mod duration_ser {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        Duration::try_milliseconds(ms)
            .ok_or_else(|| serde::de::Error::custom(format!("duration {ms}ms is out of range")))
    }
}
