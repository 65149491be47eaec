//! File-based `tracing` setup. The terminal belongs to the UI, so log lines
//! never go to stdout or stderr.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use directories::ProjectDirs;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LogConfig;
use crate::error::LoggingError;

/// Overrides the configured filter when set.
pub const LOG_ENV: &str = "FILENAV_LOG";

pub fn default_log_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "filenav")?;
    let base = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Some(base.join("filenav.log"))
}

pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    let directive = std::env::var(LOG_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| config.level.clone());
    EnvFilter::try_new(&directive).map_err(|e| LoggingError::Filter(e.to_string()))
}

/// Install the global subscriber. Returns the log file in use, or `None`
/// when logging is disabled.
pub fn init(config: &LogConfig) -> Result<Option<PathBuf>, LoggingError> {
    if !config.enabled {
        return Ok(None);
    }

    let filter = build_filter(config)?;
    let path = config
        .file
        .clone()
        .or_else(default_log_path)
        .unwrap_or_else(|| PathBuf::from("filenav.log"));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| LoggingError::Directory {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::File {
            path: path.clone(),
            source,
        })?;

    Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| LoggingError::Subscriber(e.to_string()))?;

    Ok(Some(path))
}
