pub mod dashboard;
pub mod output;
pub mod timer;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use dashboard::{DashboardCommand, process_dashboard_command};
use timer::process_timer_command;
use tracing::level_filters::LevelFilter;

use crate::{
    session::controller::{SessionController, SessionState},
    storage::{entities::Activity, gateway::PersistenceGateway, key_value::FileStore},
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, ensure_dir},
        logging::{CLI_PREFIX, enable_logging},
        time::{format_clock, format_duration_words, format_time_of_day},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Posturelog", version, long_about = None)]
#[command(about = "Times what you are doing: sitting, standing, laying down or walking", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start timing an activity")]
    Start {
        #[arg(value_enum)]
        activity: Activity,
        #[arg(short, long, help = "Open the timer right away")]
        watch: bool,
    },
    #[command(about = "Show a live timer for the running activity. Enter ends it")]
    Timer {},
    #[command(about = "End the running activity and log it")]
    Stop {},
    #[command(about = "Drop the running activity without logging it")]
    Cancel {},
    #[command(about = "Show what is being timed")]
    Status {},
    #[command(about = "Display logged activities for a date range")]
    Dashboard {
        #[command(flatten)]
        command: DashboardCommand,
    },
    #[command(about = "Remove every logged activity and the running one")]
    Clear {
        #[arg(long, help = "Don't ask for confirmation")]
        yes: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    let store = FileStore::new(app_dir.join("store"))?;
    let mut controller =
        SessionController::resume(PersistenceGateway::new(store), Box::new(DefaultClock))?;

    match args.commands {
        Commands::Start { activity, watch } => {
            let session = controller.start_activity(activity)?;
            println!(
                "Started {} at {}",
                session.activity,
                format_time_of_day(&session.start_time.with_timezone(&Local))
            );
            if watch {
                process_timer_command(&mut controller).await?;
            }
            Ok(())
        }
        Commands::Timer {} => process_timer_command(&mut controller).await,
        Commands::Stop {} => {
            let log = controller.end_activity()?;
            println!(
                "Logged {} for {}",
                log.activity,
                format_duration_words(log.duration)
            );
            Ok(())
        }
        Commands::Cancel {} => {
            let session = controller.cancel_activity()?;
            println!("Dropped {} without logging it", session.activity);
            Ok(())
        }
        Commands::Status {} => {
            match controller.state() {
                SessionState::Idle => println!("Idle, nothing is being timed"),
                SessionState::Running(session) => println!(
                    "{} for {} (since {} {})",
                    session.activity,
                    format_clock(controller.elapsed()),
                    session.activity_date,
                    format_time_of_day(&session.start_time.with_timezone(&Local))
                ),
            }
            Ok(())
        }
        Commands::Dashboard { command } => process_dashboard_command(command, &controller),
        Commands::Clear { yes } => {
            if !yes && !confirm("This removes every logged activity. Type `yes` to confirm: ")? {
                println!("Nothing was removed");
                return Ok(());
            }
            controller.clear_all()?;
            println!("All data cleared");
            Ok(())
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}
