use std::{
    fmt::Display,
    io::{self, Write},
};

use ansi_term::Colour;
use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use tracing::warn;

use crate::{
    session::controller::SessionController,
    storage::{
        entities::{Activity, ActivityLog},
        key_value::KeyValueStore,
    },
    utils::time::{format_duration_words, format_time_of_day},
};

use super::{
    Args,
    output::{DateFilter, analysis::DashboardStats},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FilterOption {
    Today,
    #[value(name = "last7days")]
    Last7Days,
    #[value(name = "last30days")]
    Last30Days,
    #[value(name = "alltime")]
    AllTime,
    Custom,
}

#[derive(Debug, Parser)]
pub struct DashboardCommand {
    #[arg(short, long, value_enum, default_value = "today", help = "Range of logs to show")]
    filter: FilterOption,
    #[arg(
        long = "start",
        short,
        help = "First day of a custom range. Examples are \"yesterday\", \"15/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "Last day of a custom range, included as a whole. Examples are \"today\", \"20/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long = "no-color", help = "Print without colors")]
    no_color: bool,
}

/// Command to process `dashboard` command. Prints a summary of the logs in the selected range.
pub fn process_dashboard_command<S: KeyValueStore>(
    DashboardCommand {
        filter,
        start_date,
        end_date,
        date_style,
        no_color,
    }: DashboardCommand,
    controller: &SessionController<S>,
) -> Result<()> {
    let now = controller.clock().time().with_timezone(&Local);
    let filter = parse_filter(filter, start_date, end_date, date_style, now)?;

    let logs = match filter.select_logs(controller.gateway(), &now) {
        Ok(logs) => logs,
        Err(e) if e.is_corrupt() => {
            warn!("Showing an empty dashboard: {e}");
            eprintln!("Stored activity logs can't be read: {e}");
            vec![]
        }
        Err(e) => return Err(e.into()),
    };

    let mut stdout = io::stdout().lock();
    render_dashboard(&mut stdout, filter.label(), &logs, &Local, !no_color)?;
    Ok(())
}

/// Start or end dates imply a custom range. Custom ranges need both.
fn parse_filter(
    filter: FilterOption,
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
    now: DateTime<Local>,
) -> Result<DateFilter> {
    let custom = filter == FilterOption::Custom || start_date.is_some() || end_date.is_some();
    if !custom {
        return Ok(match filter {
            FilterOption::Today => DateFilter::Today,
            FilterOption::Last7Days => DateFilter::Last7Days,
            FilterOption::Last30Days => DateFilter::Last30Days,
            FilterOption::AllTime | FilterOption::Custom => DateFilter::AllTime,
        });
    }

    let (Some(start_date), Some(end_date)) = (start_date, end_date) else {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::MissingRequiredArgument,
                "A custom range needs both --start and --end",
            )
            .into());
    };

    let dialect: chrono_english::Dialect = date_style.into();
    let parse = |value: &str, name: &str| {
        parse_date_string(value, now, dialect).map_err(|e| {
            Args::command().error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {name} date {e}"),
            )
        })
    };
    let start = parse(&start_date, "start")?;
    let end = parse(&end_date, "end")?;

    Ok(DateFilter::custom_days(Some(start), Some(end)))
}

const BAR_WIDTH: usize = 20;

/// Writes the dashboard for `logs`. Times of day are shown in `timezone`.
pub fn render_dashboard<Tz: TimeZone>(
    out: &mut impl Write,
    label: &str,
    logs: &[ActivityLog],
    timezone: &Tz,
    colored: bool,
) -> io::Result<()>
where
    Tz::Offset: Display,
{
    let stats = DashboardStats::from_logs(logs);
    let paint = |activity: Activity, text: String| {
        if colored {
            activity_colour(activity).paint(text).to_string()
        } else {
            text
        }
    };

    writeln!(out, "Activity Dashboard")?;
    writeln!(out, "Date range: {label}")?;
    writeln!(out)?;
    writeln!(out, "{:<20}{}", "Total time", format_duration_words(stats.total_time))?;
    writeln!(out, "{:<20}{}", "Activities logged", stats.activity_count)?;
    let most_common = stats
        .most_common_activity
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".into());
    writeln!(out, "{:<20}{}", "Most common", most_common)?;
    writeln!(out)?;

    writeln!(out, "Activity breakdown")?;
    if stats.total_time.is_zero() {
        writeln!(out, "  No activity data for selected date range")?;
    } else {
        for (activity, duration) in stats.breakdown.iter() {
            let share = stats.breakdown.share(activity);
            let filled = ((*share / 100. * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
            let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
            writeln!(
                out,
                "  {:<13}{:>12} ({:>6})  {}",
                activity.to_string(),
                format_duration_words(duration),
                share.to_string(),
                paint(activity, bar)
            )?;
        }
    }
    writeln!(out)?;

    writeln!(out, "Recent activities")?;
    if logs.is_empty() {
        writeln!(out, "  No activities logged yet")?;
    }
    for log in logs.iter().rev() {
        writeln!(
            out,
            "  {}  {} - {}  {}",
            paint(log.activity, format!("{:<13}", log.activity.to_string())),
            format_time_of_day(&log.start_time.with_timezone(timezone)),
            format_time_of_day(&log.end_time.with_timezone(timezone)),
            format_duration_words(log.duration)
        )?;
    }
    Ok(())
}

fn activity_colour(activity: Activity) -> Colour {
    match activity {
        Activity::Sitting => Colour::Blue,
        Activity::Standing => Colour::Green,
        Activity::LayingDown => Colour::Purple,
        Activity::Walking => Colour::Fixed(208),
    }
}
