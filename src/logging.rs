use std::fs::File;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

pub const LOG_PATH_ENV: &str = "LAZRGIT_LOG";

/// Install a file-backed tracing subscriber when `LAZRGIT_LOG` is set.
///
/// Output never goes to the terminal: the UI owns the alternate screen.
pub fn init() -> Result<()> {
    let log_path = match std::env::var(LOG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => return Ok(()),
    };

    let log_file = File::options()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file '{}'", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::info!(path = %log_path.display(), "logging initialised");
    Ok(())
}
