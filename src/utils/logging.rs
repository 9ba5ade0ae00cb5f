// src/utils/logging.rs
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::utils::{
    config::LoggingConfig,
    error::{IdGateError, Result},
};

/// Installs the global subscriber: stdout plus a daily rolling file under
/// `config.dir`. The returned guard flushes the file writer on drop and must
/// be held for the life of the process.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.dir)?;

    let file_appender = tracing_appender::rolling::daily(&config.dir, "idgate.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| IdGateError::Config(format!("invalid log level: {}", e)))?;

    let stdout_layer = if config.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(file_writer)
        .boxed();

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| IdGateError::Config(format!("failed to install subscriber: {}", e)))?;

    Ok(guard)
}
