use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::utils::error::Result;

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Log to stdout and to a daily-rolling file under `config.directory`.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.directory)?;

    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter(&config.level))
        .with(fmt::layer())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    Ok(guard)
}

/// Stdout-only logging, used when configuration could not be loaded.
pub fn init_stdout() {
    tracing_subscriber::registry()
        .with(filter("info"))
        .with(fmt::layer())
        .init();
}
