//! Logging initialization for dashboard hosts.
//!
//! The crate itself only emits `tracing` events; a host application calls
//! one of these once at startup. Filtering follows `RUST_LOG` when set.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

fn env_filter(default_level: &str) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Log to stderr.
pub fn init(default_level: &str) -> Result<()> {
  fmt()
    .with_env_filter(env_filter(default_level))
    .with_writer(std::io::stderr)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))
}

/// Log to a daily-rotated file in `dir`. The returned guard must be held
/// for the lifetime of the process or buffered lines are lost.
pub fn init_with_file(dir: &Path, default_level: &str) -> Result<WorkerGuard> {
  let appender = tracing_appender::rolling::daily(dir, "storeroom.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  fmt()
    .with_env_filter(env_filter(default_level))
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
