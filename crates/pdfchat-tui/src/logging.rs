//! Logging setup
//!
//! The interactive UI owns the terminal, so it logs to a daily-rolling file.
//! One-shot commands log to stderr.

use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE: &str = "pdfchat.log";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Returns a guard that must be kept alive; dropping it stops file logging.
pub fn init_file_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false) // No ANSI codes in files
                .with_target(true),
        )
        .try_init()?;

    Ok(guard)
}

pub fn init_stderr_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}
