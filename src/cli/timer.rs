use std::{
    io::{self, Write},
    time::Duration,
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    session::controller::{SessionController, SessionState},
    storage::{entities::Activity, key_value::KeyValueStore},
    utils::{
        clock::Clock,
        time::{format_clock, format_duration_words},
    },
};

const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// How the user left the timer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewExit {
    EndActivity,
    Detach,
}

/// Shows the running activity until the user presses Enter (ends it) or Ctrl-C (leaves it
/// running).
pub async fn process_timer_command<S: KeyValueStore>(
    controller: &mut SessionController<S>,
) -> Result<()> {
    let SessionState::Running(session) = controller.state().clone() else {
        println!("No activity is running. Start one with `posturelog start <activity>`.");
        return Ok(());
    };

    println!(
        "Currently {}. Press Enter to end it, Ctrl-C to leave it running.",
        session.activity
    );

    let shutdown = CancellationToken::new();
    let mut stdout = io::stdout();
    let (exit, drawn) = tokio::join!(
        wait_for_exit(shutdown.clone()),
        run_timer_display(
            session.activity,
            session.start_time,
            controller.clock(),
            REFRESH_INTERVAL,
            shutdown.clone(),
            &mut stdout,
        ),
    );
    let frames = drawn?;
    debug!("Timer view closed with {exit:?} after {frames} frames");

    match exit {
        ViewExit::EndActivity => {
            let log = controller.end_activity()?;
            println!(
                "Logged {} for {}",
                log.activity,
                format_duration_words(log.duration)
            );
        }
        ViewExit::Detach => {
            info!("Left timer view, {} keeps running", session.activity);
            println!("{} keeps running.", session.activity);
        }
    }
    Ok(())
}

/// Redraws the elapsed time of an activity started at `start_time` until `shutdown` is
/// cancelled. Elapsed time is recomputed from the clock on every frame, the loop holds no state.
/// Returns the number of frames drawn.
///
/// The token is cancelled whenever this returns, so whatever waits on it stops too.
pub async fn run_timer_display(
    activity: Activity,
    start_time: DateTime<Utc>,
    clock: &dyn Clock,
    refresh: Duration,
    shutdown: CancellationToken,
    out: &mut impl Write,
) -> Result<usize> {
    let _guard = shutdown.clone().drop_guard();
    let mut refresh_point = clock.instant();
    let mut frames = 0;
    loop {
        refresh_point += refresh;

        let elapsed = (clock.time() - start_time).max(chrono::Duration::zero());
        write!(out, "\r{activity}  {}", format_clock(elapsed))?;
        out.flush()?;
        frames += 1;

        tokio::select! {
            _ = shutdown.cancelled() => {
                writeln!(out)?;
                return Ok(frames);
            }
            _ = clock.sleep_until(refresh_point) => ()
        }
    }
}

/// Resolves once the user asks to leave the view, then cancels `shutdown`.
async fn wait_for_exit(shutdown: CancellationToken) -> ViewExit {
    let (sender, receiver) = oneshot::channel();
    // tokio's stdin can't be cancelled and would keep the runtime alive on Ctrl-C, so the read
    // gets a detached thread of its own.
    std::thread::spawn(move || {
        let mut line = String::new();
        if matches!(io::stdin().read_line(&mut line), Ok(read) if read > 0) {
            let _ = sender.send(());
        }
    });

    let exit = tokio::select! {
        _ = tokio::signal::ctrl_c() => ViewExit::Detach,
        _ = shutdown.cancelled() => ViewExit::Detach,
        received = receiver => match received {
            Ok(()) => ViewExit::EndActivity,
            // stdin closed, nobody can press Enter anymore
            Err(_) => ViewExit::Detach,
        },
    };
    shutdown.cancel();
    exit
}
