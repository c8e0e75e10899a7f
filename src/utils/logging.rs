use std::{path::Path, sync::LazyLock};

use anyhow::{Result, anyhow};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    EnvFilter,
    fmt::{format::FmtSpan, writer::MakeWriterExt},
};

pub const CLI_PREFIX: &str = "cli";

const DEFAULT_LEVEL: &str = "info";
const KEPT_LOG_FILES: usize = 5;

/// Logs into daily rotated files under `<application_data_path>/logs`. `show_std` mirrors the
/// output to stderr, stdout belongs to the timer and dashboard.
pub fn enable_logging(
    prefix: &str,
    application_data_path: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(prefix)
        .build(application_data_path.join("logs"))?;

    let stderr = std::io::stderr.with_filter(move |_| show_std);
    let level = resolve_level(log_level, std::env::var("RUST_LOG").ok());

    tracing_subscriber::fmt()
        .with_env_filter(crate_filter(&level))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stderr.and(appender))
        .pretty()
        .try_init()
        .map_err(|e| anyhow!(e))
}

/// `--log` wins over `RUST_LOG`, which wins over [DEFAULT_LEVEL].
fn resolve_level(log_level: Option<LevelFilter>, env_level: Option<String>) -> String {
    log_level
        .map(|v| v.to_string())
        .or(env_level)
        .unwrap_or_else(|| DEFAULT_LEVEL.into())
}

/// Only this crate's events pass, storage and runtime crates stay quiet.
fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "{}={level}",
        env!("CARGO_PKG_NAME").replace('-', "_"),
    ))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});
