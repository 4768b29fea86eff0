//! Store configuration
//!
//! Configuration is loaded from:
//! 1. Platform defaults
//! 2. Config file (~/.config/hostsfile/config.toml)
//! 3. Environment variables (HOSTS_PATH, HOSTSFILE_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable prefix
const ENV_PREFIX: &str = "HOSTSFILE";

/// Overrides the hosts file location
pub const HOSTS_PATH_ENV: &str = "HOSTS_PATH";

/// Name cap Windows enforces before every flush
pub const WINDOWS_NAMES_PER_LINE: usize = 9;

/// Line terminator written after every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    /// The terminator native to the current platform
    pub fn platform() -> Self {
        if cfg!(windows) {
            LineEnding::Crlf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "lf" => Some(LineEnding::Lf),
            "crlf" => Some(LineEnding::Crlf),
            _ => None,
        }
    }
}

impl Default for LineEnding {
    fn default() -> Self {
        Self::platform()
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Location of the hosts file
    #[serde(default = "default_hosts_path")]
    pub path: PathBuf,

    /// Terminator used when writing
    #[serde(default)]
    pub line_ending: LineEnding,

    /// Maximum names per line, applied before every flush
    #[serde(default = "default_names_per_line")]
    pub names_per_line: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: default_hosts_path(),
            line_ending: LineEnding::platform(),
            names_per_line: default_names_per_line(),
        }
    }
}

impl Config {
    /// Configuration for a specific hosts file, platform defaults otherwise
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (HOSTS_PATH, HOSTSFILE_LINE_ENDING, HOSTSFILE_NAMES_PER_LINE)
    /// 2. Config file (~/.config/hostsfile/config.toml or HOSTSFILE_CONFIG)
    /// 3. Platform defaults
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // HOSTS_PATH (ignored when empty)
        if let Ok(val) = std::env::var(HOSTS_PATH_ENV) {
            if !val.is_empty() {
                self.path = PathBuf::from(val);
            }
        }

        // HOSTSFILE_LINE_ENDING
        if let Ok(val) = std::env::var(format!("{}_LINE_ENDING", ENV_PREFIX)) {
            match LineEnding::parse(&val) {
                Some(ending) => self.line_ending = ending,
                None => warn!("Ignoring unknown line ending {:?}", val),
            }
        }

        // HOSTSFILE_NAMES_PER_LINE, 0 disables the cap
        if let Ok(val) = std::env::var(format!("{}_NAMES_PER_LINE", ENV_PREFIX)) {
            match val.trim().parse::<usize>() {
                Ok(0) => self.names_per_line = None,
                Ok(n) => self.names_per_line = Some(n),
                Err(_) => warn!("Ignoring invalid names per line {:?}", val),
            }
        }
    }

    /// Save configuration to a file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with HOSTSFILE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hostsfile")
            .join("config.toml")
    }

    /// Path of the default backup copy
    pub fn backup_path(&self) -> PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(".bak");
        PathBuf::from(path)
    }
}

/// Get the platform hosts file location
fn default_hosts_path() -> PathBuf {
    if cfg!(windows) {
        std::env::var_os("SystemRoot")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Windows"))
            .join("System32")
            .join("drivers")
            .join("etc")
            .join("hosts")
    } else {
        PathBuf::from("/etc/hosts")
    }
}

fn default_names_per_line() -> Option<usize> {
    if cfg!(windows) {
        Some(WINDOWS_NAMES_PER_LINE)
    } else {
        None
    }
}
