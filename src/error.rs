use std::path::PathBuf;
use thiserror::Error;

/// Errors raised at the entry boundary (opening content, launching files).
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{label}: operation not supported for this entry")]
    Unsupported { label: String },

    #[error("Failed to launch external opener for {path}: {reason}")]
    Launch { path: PathBuf, reason: String },
}

impl EntryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EntryError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn unsupported(label: impl Into<String>) -> Self {
        EntryError::Unsupported {
            label: label.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install subscriber: {0}")]
    Subscriber(String),
}
