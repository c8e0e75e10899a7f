use std::fmt::Display;

use chrono::{DateTime, Duration, TimeZone};

/// Hours, minutes and seconds of a duration, each zero padded to at least two digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockDisplay {
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
}

impl Display for ClockDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.hours, self.minutes, self.seconds)
    }
}

/// Splits whole seconds of `duration` into clock components. Hours are never wrapped, so 100
/// hours stays "100".
pub fn format_clock(duration: Duration) -> ClockDisplay {
    let (hours, minutes, seconds) = split_seconds(duration);
    ClockDisplay {
        hours: format!("{hours:02}"),
        minutes: format!("{minutes:02}"),
        seconds: format!("{seconds:02}"),
    }
}

/// Compact form used on the dashboard, e.g. "1h 2m 3s", "4m 0s" or "59s".
pub fn format_duration_words(duration: Duration) -> String {
    let (hours, minutes, seconds) = split_seconds(duration);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

fn split_seconds(duration: Duration) -> (i64, i64, i64) {
    // Durations come from end - start which is never negative, but don't print "-1s" if it is.
    let total_seconds = duration.num_seconds().max(0);
    (
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60,
    )
}

/// Date an activity started on, formatted the way en-US locales print dates: `3/7/2025`.
pub fn activity_date_string<Tz: TimeZone>(moment: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    moment.format("%-m/%-d/%Y").to_string()
}

/// Time of day as shown next to a log, e.g. "09:05 PM".
pub fn format_time_of_day<Tz: TimeZone>(moment: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    moment.format("%I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{activity_date_string, format_clock, format_duration_words, format_time_of_day};

    #[test]
    fn test_clock_components_add_up() {
        for ms in [0, 999, 1_000, 59_999, 61_000, 3_599_999, 3_600_000, 86_399_999, 123_456_789] {
            let clock = format_clock(Duration::milliseconds(ms));
            let hours: i64 = clock.hours.parse().unwrap();
            let minutes: i64 = clock.minutes.parse().unwrap();
            let seconds: i64 = clock.seconds.parse().unwrap();

            assert_eq!(hours * 3600 + minutes * 60 + seconds, ms / 1000);
            assert!(minutes < 60 && seconds < 60);
            assert!(clock.hours.len() >= 2);
            assert_eq!(clock.minutes.len(), 2);
            assert_eq!(clock.seconds.len(), 2);
        }
    }

    #[test]
    fn test_clock_display() {
        assert_eq!(format_clock(Duration::milliseconds(3_723_400)).to_string(), "01:02:03");
        assert_eq!(format_clock(Duration::zero()).to_string(), "00:00:00");
        assert_eq!(format_clock(Duration::hours(100)).hours, "100");
    }

    #[test]
    fn test_duration_words() {
        assert_eq!(format_duration_words(Duration::milliseconds(3_723_000)), "1h 2m 3s");
        assert_eq!(format_duration_words(Duration::hours(2)), "2h 0m 0s");
        assert_eq!(format_duration_words(Duration::seconds(240)), "4m 0s");
        assert_eq!(format_duration_words(Duration::milliseconds(59_999)), "59s");
        assert_eq!(format_duration_words(Duration::zero()), "0s");
    }

    #[test]
    fn test_dates() {
        let moment = Utc.with_ymd_and_hms(2025, 3, 7, 21, 5, 0).unwrap();
        assert_eq!(activity_date_string(&moment), "3/7/2025");
        assert_eq!(format_time_of_day(&moment), "09:05 PM");
    }
}
