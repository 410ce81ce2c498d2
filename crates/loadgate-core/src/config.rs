//! Configuration file and environment handling.
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `LOADGATE_DB_PATH` | SQLite database path (default: `loadgate.db`) |
//! | `LOADGATE_MAX_CONCURRENT_WRITES` | Concurrent detail writes during ingest (default: 10) |
//!
//! ```yaml
//! database:
//!   path: results.db
//! ingest:
//!   max_concurrent_writes: 8
//! ```

use crate::ingest::DEFAULT_MAX_CONCURRENT_WRITES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "loadgate.yaml";
pub const ENV_DB_PATH: &str = "LOADGATE_DB_PATH";
pub const ENV_MAX_CONCURRENT_WRITES: &str = "LOADGATE_MAX_CONCURRENT_WRITES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Upper bound on detail writes in flight during one ingest call.
    #[serde(default = "default_max_concurrent_writes")]
    pub max_concurrent_writes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_writes: default_max_concurrent_writes(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("loadgate.db")
}

fn default_max_concurrent_writes() -> usize {
    DEFAULT_MAX_CONCURRENT_WRITES
}

impl Config {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let path_display = path.display().to_string();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path_display, "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path_display,
                    source,
                })
            }
        };
        Self::from_yaml_str(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path_display,
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })
    }

    /// Apply `LOADGATE_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            if !path.trim().is_empty() {
                self.database.path = PathBuf::from(path);
            }
        }
        if let Ok(raw) = std::env::var(ENV_MAX_CONCURRENT_WRITES) {
            self.ingest.max_concurrent_writes =
                raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: ENV_MAX_CONCURRENT_WRITES.to_string(),
                    message: format!("expected a positive integer, got '{}'", raw),
                })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "database.path".to_string(),
                message: "is required".to_string(),
            });
        }
        if self.ingest.max_concurrent_writes == 0 {
            return Err(ConfigError::Invalid {
                key: "ingest.max_concurrent_writes".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.database.path, PathBuf::from("loadgate.db"));
        assert_eq!(cfg.ingest.max_concurrent_writes, 10);
        cfg.validate().unwrap();
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "ingest:\n  max_concurrent_writes: 3").unwrap();
        let cfg = Config::load(f.path()).unwrap();
        assert_eq!(cfg.ingest.max_concurrent_writes, 3);
        assert_eq!(cfg.database.path, PathBuf::from("loadgate.db"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "database: [unclosed").unwrap();
        let err = Config::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&f.path().display().to_string()));
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let cfg = Config::from_yaml_str("ingest:\n  max_concurrent_writes: 0\n").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    #[serial]
    fn env_overrides_file_values() {
        std::env::set_var(ENV_DB_PATH, "/tmp/other.db");
        std::env::set_var(ENV_MAX_CONCURRENT_WRITES, "2");
        let cfg = Config::from_yaml_str("database:\n  path: file.db\n")
            .unwrap()
            .with_env_overrides();
        std::env::remove_var(ENV_DB_PATH);
        std::env::remove_var(ENV_MAX_CONCURRENT_WRITES);

        let cfg = cfg.unwrap();
        assert_eq!(cfg.database.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(cfg.ingest.max_concurrent_writes, 2);
    }

    #[test]
    #[serial]
    fn bad_env_concurrency_is_rejected() {
        std::env::set_var(ENV_MAX_CONCURRENT_WRITES, "many");
        let res = Config::default().with_env_overrides();
        std::env::remove_var(ENV_MAX_CONCURRENT_WRITES);
        assert!(matches!(res, Err(ConfigError::Invalid { .. })));
    }
}
