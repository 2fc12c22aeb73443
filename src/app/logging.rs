//! Logging setup: console plus a daily-rolling file under `logs/`.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Install the global subscriber. The returned guard must be held for the
/// process lifetime or buffered file output is lost.
pub fn init(debug: bool, file_logging: bool) -> Option<WorkerGuard> {
    let default_level = if debug { "debug" } else { "info" };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = if file_logging {
        let _ = std::fs::create_dir_all("logs");
        let appender = tracing_appender::rolling::daily("logs", "sync.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_filter(EnvFilter::new("info"));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(console_filter))
        .with(file_layer)
        .init();

    guard
}
