// Logger initialization
// Console output always; a daily-rolling file as well when a log directory is configured and writable.

use std::path::Path;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "chroma_miner=debug,tower_http=debug,axum=info";
const LOG_FILE_PREFIX: &str = "chroma-miner.log";

fn file_appender(dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
}

/// Install the global subscriber. Keep the returned guard alive for as long
/// as file logging should keep flushing.
pub fn init_logger(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let mut file_error = None;
    let (file_layer, guard) = match log_dir.map(|dir| (dir, file_appender(dir))) {
        Some((_, Ok(appender))) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        Some((dir, Err(e))) => {
            file_error = Some((dir, e));
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    if let Some((dir, e)) = file_error {
        warn!(path = %dir.display(), error = %e, "Cannot write log files, logging to console only");
    }

    guard
}
