//! Plugin log file.

use crate::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE: &str = "InvLocker.log";

/// Start writing `InvLocker.log` in `log_dir`, replacing any previous log.
///
/// `debugging` raises the default level from INFO to DEBUG; `RUST_LOG`
/// overrides both.
pub fn init(log_dir: &Path, debugging: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(LOG_FILE);
    let file = File::create(&path)?;

    let level = if debugging {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(filter)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;
    Ok(path)
}
