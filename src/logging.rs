//! File-based logging
//!
//! The client is a desktop application without a useful stdout, so logs go
//! to a daily rotating file. The level can be controlled with `RUST_LOG`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::LoggingConfig;

/// Initialize the logging system.
///
/// Logs are written to `<directory>/<file_prefix>.YYYY-MM-DD`. Without
/// `RUST_LOG`, `config.default_filter` applies. The returned guard flushes
/// pending lines when dropped and must be kept alive by the caller.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<WorkerGuard> {
    let log_dir = Path::new(&config.directory);
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("Logging initialized - logs written to {}/", config.directory);

    Ok(guard)
}

/// Log a page fetch request
#[macro_export]
macro_rules! log_fetch_request {
    ($operation:expr, $($field:tt)*) => {
        tracing::debug!(operation = $operation, $($field)*, "Page fetch started");
    };
}

/// Log the outcome of a page fetch
#[macro_export]
macro_rules! log_fetch_result {
    ($operation:expr, $result:expr) => {
        match &$result {
            Ok(items) => tracing::debug!(
                operation = $operation,
                count = items.len(),
                "Page fetch successful"
            ),
            Err(e) => tracing::error!(operation = $operation, error = %e, "Page fetch failed"),
        }
    };
}
