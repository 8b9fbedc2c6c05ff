use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "FILL_LINE_LOG";

/// The terminal belongs to the game, so logs go to a file. Filter comes from
/// `FILL_LINE_LOG` (defaults to `info`).
pub fn init_logging(log_path: &Path) -> Result<()> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("could not open log file {}", log_path.display()))?;

    let _ = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
