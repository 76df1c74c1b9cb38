//! Runtime configuration for the task manager core.
//!
//! Values come from defaults, from a deserialized document (any serde format
//! the shell prefers) or from `TASKMATE_*` environment variables.

use crate::credential::CredentialParams;
use crate::logging::{default_log_level, LogLevel};
use crate::monitor::DEFAULT_SCAN_INTERVAL;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DB_FILE_NAME: &str = "taskmate.sqlite3";

pub const ENV_DB_PATH: &str = "TASKMATE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TASKMATE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKMATE_LOG_DIR";
pub const ENV_OVERDUE_INTERVAL_SECS: &str = "TASKMATE_OVERDUE_INTERVAL_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid configuration value for `{key}`: `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Process-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub overdue_interval_secs: u64,
    pub credential: CredentialParams,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().as_str().to_string(),
            log_dir: None,
            overdue_interval_secs: DEFAULT_SCAN_INTERVAL.as_secs(),
            credential: CredentialParams::default(),
        }
    }
}

impl CoreConfig {
    /// Reads overrides from the process environment on top of defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup` on top of defaults.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = read(ENV_OVERDUE_INTERVAL_SECS) {
            config.overdue_interval_secs =
                raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: ENV_OVERDUE_INTERVAL_SECS,
                    value: raw.clone(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level()?;
        if self.overdue_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "overdue_interval_secs",
                value: "0".to_string(),
            });
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    key: "log_dir",
                    value: dir.display().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn log_level(&self) -> Result<LogLevel, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "log_level",
                value: self.log_level.clone(),
            })
    }

    pub fn overdue_interval(&self) -> Duration {
        Duration::from_secs(self.overdue_interval_secs)
    }
}
