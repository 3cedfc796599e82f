//! Runtime configuration resolved from the process environment.
//!
//! # Responsibility
//! - Resolve database path, logging and trace URL settings with defaults.
//! - Reject malformed values instead of silently falling back.
//!
//! # Invariants
//! - Blank variables count as unset.
//! - `id_max_attempts` is always at least 1.

use crate::logging::{default_log_level, normalize_level};
use crate::service::rizara_id::DEFAULT_MAX_ATTEMPTS;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "RIZARA_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "RIZARA_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "RIZARA_LOG_DIR";
pub const PUBLIC_BASE_URL_ENV: &str = "RIZARA_PUBLIC_BASE_URL";
pub const ID_MAX_ATTEMPTS_ENV: &str = "RIZARA_ID_MAX_ATTEMPTS";

const DEFAULT_DB_FILE_NAME: &str = "rizara_records.sqlite3";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug)]
pub enum ConfigError {
    /// A variable is set but its value cannot be used.
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                name,
                value,
                reason,
            } => write!(f, "invalid {name}=`{value}`: {reason}"),
        }
    }
}

impl Error for ConfigError {}

/// Settings shared by the CLI and embedding hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite file. Defaults to a file in the system temp dir.
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// Prefix of public trace URLs, without trailing slash.
    pub public_base_url: String,
    /// Rizara id candidates tried per goat registration.
    pub id_max_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level(),
            log_dir: None,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            id_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl StoreConfig {
    /// Resolves settings from `RIZARA_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves settings through `lookup`, so callers and tests can supply
    /// variables without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(DB_PATH_ENV) {
            config.db_path = PathBuf::from(path);
        }

        if let Some(level) = read(LOG_LEVEL_ENV) {
            config.log_level = normalize_level(&level).map_err(|err| ConfigError::InvalidValue {
                name: LOG_LEVEL_ENV,
                value: level.clone(),
                reason: err.to_string(),
            })?;
        }

        if let Some(dir) = read(LOG_DIR_ENV) {
            let path = PathBuf::from(&dir);
            if !path.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    name: LOG_DIR_ENV,
                    value: dir,
                    reason: "must be an absolute path".to_string(),
                });
            }
            config.log_dir = Some(path);
        }

        if let Some(url) = read(PUBLIC_BASE_URL_ENV) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    name: PUBLIC_BASE_URL_ENV,
                    value: url,
                    reason: "expected an http(s) URL".to_string(),
                });
            }
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(raw) = read(ID_MAX_ATTEMPTS_ENV) {
            config.id_max_attempts = match raw.parse::<u32>() {
                Ok(value) if value > 0 => value,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: ID_MAX_ATTEMPTS_ENV,
                        value: raw,
                        reason: "expected a positive integer".to_string(),
                    })
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, StoreConfig, DB_PATH_ENV, ID_MAX_ATTEMPTS_ENV, LOG_DIR_ENV, LOG_LEVEL_ENV,
        PUBLIC_BASE_URL_ENV,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn resolve(vars: &[(&str, &str)]) -> Result<StoreConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        StoreConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = resolve(&[]).expect("defaults should resolve");
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.id_max_attempts, 5);
        assert_eq!(config.public_base_url, "http://127.0.0.1:5000");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn overrides_are_applied_and_blank_values_ignored() {
        let config = resolve(&[
            (DB_PATH_ENV, " /var/lib/rizara/store.db "),
            (LOG_LEVEL_ENV, "WARNING"),
            (LOG_DIR_ENV, "   "),
            (PUBLIC_BASE_URL_ENV, "https://trace.rizara.example/"),
            (ID_MAX_ATTEMPTS_ENV, "9"),
        ])
        .expect("overrides should resolve");
        assert_eq!(config.db_path, PathBuf::from("/var/lib/rizara/store.db"));
        assert_eq!(config.log_level, "warn");
        assert!(config.log_dir.is_none());
        assert_eq!(config.public_base_url, "https://trace.rizara.example");
        assert_eq!(config.id_max_attempts, 9);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (name, value) in [
            (LOG_LEVEL_ENV, "loud"),
            (LOG_DIR_ENV, "logs/dev"),
            (PUBLIC_BASE_URL_ENV, "trace.rizara.example"),
            (ID_MAX_ATTEMPTS_ENV, "0"),
            (ID_MAX_ATTEMPTS_ENV, "many"),
        ] {
            let err = resolve(&[(name, value)]).expect_err("value should be rejected");
            let ConfigError::InvalidValue { name: reported, .. } = err;
            assert_eq!(reported, name);
        }
    }
}
