use anyhow::{Context, Result};
use dirs::config_dir;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::{self, Database};

const APP_NAME: &str = "agile-manifest";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_PORT: u16 = 17010;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Port for the HTTP API
    pub port: u16,
    /// Allowed CORS origins. Any origin is allowed when unset.
    pub cors_origins: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            port: DEFAULT_PORT,
            cors_origins: None,
        }
    }
}

impl Config {
    /// Load configuration from the user's config directory, then apply
    /// environment overrides.
    /// Falls back to defaults if the file doesn't exist or fails to parse.
    pub fn load() -> Self {
        let config = match get_config_path().and_then(|path| Self::try_load(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Apply `AGILE_MANIFEST_DB`, `AGILE_MANIFEST_PORT` and
    /// `AGILE_MANIFEST_CORS_ORIGINS` (comma-separated).
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = var("AGILE_MANIFEST_DB") {
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(port) = var("AGILE_MANIFEST_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!(%port, "ignoring invalid AGILE_MANIFEST_PORT"),
            }
        }

        if let Some(origins) = var("AGILE_MANIFEST_CORS_ORIGINS") {
            self.cors_origins = Some(
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        self
    }

    /// Open and migrate the configured database.
    pub fn open_database(&self) -> Result<Database> {
        let path = match &self.database_path {
            Some(path) => path.clone(),
            None => db::default_path()?,
        };
        tracing::info!(path = %path.display(), "opening database");

        let db = Database::open(path)?;
        db.migrate()?;
        Ok(db)
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::try_load(&dir.path().join("config.json")).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"port": 9000}"#).unwrap();

        let config = Config::try_load(&path).unwrap();

        assert_eq!(config.port, 9000);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Config::try_load(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default().with_env_overrides(env(&[
            ("AGILE_MANIFEST_DB", "/tmp/backlog.db"),
            ("AGILE_MANIFEST_PORT", "4100"),
            ("AGILE_MANIFEST_CORS_ORIGINS", "http://a.test, http://b.test,"),
        ]));

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/backlog.db")));
        assert_eq!(config.port, 4100);
        assert_eq!(
            config.cors_origins,
            Some(vec!["http://a.test".to_string(), "http://b.test".to_string()])
        );
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let config = Config::default().with_env_overrides(env(&[("AGILE_MANIFEST_PORT", "high")]));

        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_open_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("backlog.db");
        let config = Config {
            database_path: Some(path.clone()),
            ..Config::default()
        };

        config.open_database().unwrap();

        assert!(path.exists());
    }
}
