// Logging setup - everything goes to debug.log, and only when asked for.
// The terminal belongs to the UI, so nothing is ever written to stdout/stderr.

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "debug.log";

/// Install the file logger when `debug` is set. Without it no subscriber is
/// installed and every log call is a no-op.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(debug: bool, dir: &Path) -> Result<Option<WorkerGuard>> {
    if !debug {
        return Ok(None);
    }

    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG wins, otherwise info everywhere and debug for us
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,alio=debug"));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(Some(guard))
}
