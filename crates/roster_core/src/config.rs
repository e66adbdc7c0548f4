//! Roster configuration loading.
//!
//! # Responsibility
//! - Read optional TOML settings and fill in defaults.
//! - Apply the `ROSTER_SIMULATE_PUBLISH` environment switch.
//!
//! # Invariants
//! - A missing config file yields defaults, never an error.
//! - Relative paths in a config file resolve against the file's directory.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable forcing the publish simulator on or off.
pub const SIMULATE_PUBLISH_ENV: &str = "ROSTER_SIMULATE_PUBLISH";
/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "roster.toml";

/// Config load failure.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidEnv {
        name: &'static str,
        value: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::InvalidEnv { name, value } => {
                write!(f, "invalid value `{value}` for {name}; expected 1|0|true|false|yes|no")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidEnv { .. } => None,
        }
    }
}

/// On-disk shape; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RosterConfigFile {
    data_dir: Option<PathBuf>,
    changelog_path: Option<PathBuf>,
    snapshot_dir: Option<PathBuf>,
    repo_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    log_level: Option<String>,
    simulate_publish: Option<bool>,
    push: Option<bool>,
}

/// Effective runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterConfig {
    /// Directory holding the tier files.
    pub data_dir: PathBuf,
    pub changelog_path: PathBuf,
    /// Directory used for batch snapshots; must not exist between sessions.
    pub snapshot_dir: PathBuf,
    /// Working tree used by the git publisher; defaults to the directory
    /// holding the config file.
    pub repo_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    /// Route publish calls to the no-op simulator.
    pub simulate_publish: bool,
    /// Push after committing.
    pub push: bool,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            changelog_path: PathBuf::from("CHANGELOG.md"),
            snapshot_dir: PathBuf::from(".roster-snapshot"),
            repo_dir: PathBuf::from("."),
            log_dir: PathBuf::from("logs"),
            log_level: default_log_level().to_string(),
            simulate_publish: false,
            push: false,
        }
    }
}

impl RosterConfig {
    /// Loads settings from `path`, falling back to defaults when absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_toml_str(&text, base_dir).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses TOML settings, resolving relative paths against `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, toml::de::Error> {
        let file: RosterConfigFile = toml::from_str(text)?;
        let defaults = Self::default();
        let resolve = |value: Option<PathBuf>, fallback: PathBuf| {
            let value = value.unwrap_or(fallback);
            if value.is_absolute() {
                value
            } else {
                base_dir.join(value)
            }
        };

        Ok(Self {
            data_dir: resolve(file.data_dir, defaults.data_dir),
            changelog_path: resolve(file.changelog_path, defaults.changelog_path),
            snapshot_dir: resolve(file.snapshot_dir, defaults.snapshot_dir),
            repo_dir: match file.repo_dir {
                Some(dir) => resolve(Some(dir), PathBuf::new()),
                None if base_dir.as_os_str().is_empty() => defaults.repo_dir,
                None => base_dir.to_path_buf(),
            },
            log_dir: resolve(file.log_dir, defaults.log_dir),
            log_level: file.log_level.unwrap_or(defaults.log_level),
            simulate_publish: file.simulate_publish.unwrap_or(defaults.simulate_publish),
            push: file.push.unwrap_or(defaults.push),
        })
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        let value = std::env::var(SIMULATE_PUBLISH_ENV).ok();
        self.apply_simulate_override(value.as_deref())
    }

    /// Applies a raw `ROSTER_SIMULATE_PUBLISH` value; `None` keeps the file setting.
    pub fn apply_simulate_override(&mut self, value: Option<&str>) -> Result<(), ConfigError> {
        let Some(raw) = value else {
            return Ok(());
        };
        self.simulate_publish = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    name: SIMULATE_PUBLISH_ENV,
                    value: raw.to_string(),
                })
            }
        };
        Ok(())
    }
}
