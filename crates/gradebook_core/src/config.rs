//! Runtime configuration for engine callers.
//!
//! # Responsibility
//! - Resolve data, database and log locations.
//! - Parse environment overrides into typed settings.
//!
//! # Invariants
//! - Every resolved path is absolute.
//! - Invalid override values are errors, never silently ignored.

use crate::logging::{default_log_level, parse_log_level, LoggingError};
use crate::service::allocator::FreedWeightPolicy;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "GRADEBOOK_HOME";
pub const DB_ENV: &str = "GRADEBOOK_DB";
pub const LOG_LEVEL_ENV: &str = "GRADEBOOK_LOG_LEVEL";
pub const FREED_WEIGHT_ENV: &str = "GRADEBOOK_FREED_WEIGHT";

const DEFAULT_HOME_DIR_NAME: &str = ".gradebook";
const DB_FILE_NAME: &str = "gradebook.db";
const LOG_DIR_NAME: &str = "logs";

/// Configuration resolution failure.
#[derive(Debug)]
pub enum ConfigError {
    /// Neither `GRADEBOOK_HOME` nor `HOME` is set.
    MissingHome,
    RelativePath { origin: &'static str, path: PathBuf },
    InvalidLogLevel(LoggingError),
    InvalidFreedWeightPolicy(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHome => write!(f, "cannot locate a home directory; set {HOME_ENV}"),
            Self::RelativePath { origin, path } => write!(
                f,
                "{origin} must be an absolute path, got `{}`",
                path.display()
            ),
            Self::InvalidLogLevel(err) => write!(f, "{err}"),
            Self::InvalidFreedWeightPolicy(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidLogLevel(err) => Some(err),
            _ => None,
        }
    }
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradebookConfig {
    pub home_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: &'static str,
    pub freed_weight_policy: FreedWeightPolicy,
}

impl GradebookConfig {
    /// Defaults rooted at `home_dir`.
    pub fn with_home(home_dir: impl Into<PathBuf>) -> Self {
        let home_dir = home_dir.into();
        Self {
            db_path: home_dir.join(DB_FILE_NAME),
            log_dir: home_dir.join(LOG_DIR_NAME),
            home_dir,
            log_level: default_log_level(),
            freed_weight_policy: FreedWeightPolicy::default(),
        }
    }

    /// Resolves settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let home_dir = match var(HOME_ENV) {
            Some(home) => absolute(HOME_ENV, PathBuf::from(home.trim()))?,
            None => var("HOME")
                .map(|home| PathBuf::from(home.trim()).join(DEFAULT_HOME_DIR_NAME))
                .ok_or(ConfigError::MissingHome)?,
        };
        let mut config = Self::with_home(absolute("HOME", home_dir)?);

        if let Some(db_path) = var(DB_ENV) {
            config.db_path = absolute(DB_ENV, PathBuf::from(db_path.trim()))?;
        }
        if let Some(level) = var(LOG_LEVEL_ENV) {
            config.set_log_level(&level)?;
        }
        if let Some(policy) = var(FREED_WEIGHT_ENV) {
            config.set_freed_weight_policy(&policy)?;
        }
        Ok(config)
    }

    pub fn set_log_level(&mut self, level: &str) -> Result<(), ConfigError> {
        self.log_level = parse_log_level(level).map_err(ConfigError::InvalidLogLevel)?;
        Ok(())
    }

    pub fn set_freed_weight_policy(&mut self, policy: &str) -> Result<(), ConfigError> {
        self.freed_weight_policy = policy
            .parse()
            .map_err(ConfigError::InvalidFreedWeightPolicy)?;
        Ok(())
    }

    /// Overrides the database path; relative paths resolve against the
    /// current directory.
    pub fn set_db_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.db_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|_| ConfigError::RelativePath {
                    origin: "--db-path",
                    path: path.to_path_buf(),
                })?
                .join(path)
        };
        Ok(())
    }
}

fn absolute(origin: &'static str, path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(ConfigError::RelativePath { origin, path })
    }
}
