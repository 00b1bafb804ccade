use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sets up tracing with a human-readable console layer and a daily-rotated
/// JSON file under `logs/`.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "harvester.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env().add_directive("event_harvester=info".parse().unwrap()),
        )
        .with(file_layer)
        .with(console_layer)
        .init();

    // Dropping the guard would stop the background writer; leak it so the
    // file layer keeps flushing for the life of the process.
    std::mem::forget(guard);
}
