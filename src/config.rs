use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::navigation::{NavPolicy, DEFAULT_SCROLL_MARGIN};

pub const CONFIG_ENV: &str = "FILENAV_CONFIG";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root shown at startup; home directory when unset.
    pub initial_root: Option<PathBuf>,
    pub worker_threads: usize,
    pub scroll_margin: usize,
    /// Upper bound on bytes read for one preview.
    pub max_preview_bytes: usize,
    pub sniff_unknown_types: bool,
    /// Double-click on a file hands it to the platform opener.
    pub double_click_opens: bool,
    pub double_click_ms: u64,
    pub navigation: NavPolicy,
    pub logging: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_root: None,
            worker_threads: 4,
            scroll_margin: DEFAULT_SCROLL_MARGIN,
            max_preview_bytes: 256 * 1024,
            sniff_unknown_types: true,
            double_click_opens: false,
            double_click_ms: 400,
            navigation: NavPolicy::default(),
            logging: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub enabled: bool,
    /// `EnvFilter` directive, e.g. "info" or "filenav=debug".
    pub level: String,
    /// Log file; platform state directory when unset.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// `$FILENAV_CONFIG`, then the platform config dir. Missing files mean
    /// defaults; a file that exists but does not parse is an error.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Self::load(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn initial_root(&self) -> PathBuf {
        self.initial_root.clone().unwrap_or_else(default_root)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "filenav").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn default_root() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/"))
}
