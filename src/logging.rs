//! Tracing subscriber setup.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "spadesk=info,tower_http=info";

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to stdout, for the HTTP server.
pub fn init_stdout() -> Result<()> {
  tracing_subscriber::registry()
    .with(env_filter())
    .with(fmt::layer().with_target(true))
    .try_init()
    .map_err(|e| eyre!("Failed to initialise logging: {}", e))
}

/// Log to a daily rolling file under `dir`, since the dashboard owns the
/// terminal. Keep the guard alive until exit or buffered lines are lost.
pub fn init_file(dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(dir, "spadesk.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(env_filter())
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to initialise logging: {}", e))?;

  Ok(guard)
}

/// `<data dir>/spadesk/logs`
pub fn default_log_dir() -> Result<std::path::PathBuf> {
  dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .map(|d| d.join("spadesk").join("logs"))
    .ok_or_else(|| eyre!("Could not determine data directory"))
}
