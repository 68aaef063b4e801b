//! Application settings: which backend to run and where it keeps its data.
//!
//! Settings come from an optional TOML file (`hbnb.toml`, or the path in `HBNB_CONFIG`)
//! and are then overridden by the `HBNB_*` environment variables, which are usually
//! provided through a `.env` file loaded at start-up.

use super::database::DatabaseConfig;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default location of the file backend's JSON document.
pub const DEFAULT_FILE_PATH: &str = "file.json";

/// Which storage medium the engine uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Single JSON document on disk
    #[default]
    File,
    /// Relational database through `SeaORM`
    Db,
}

impl BackendKind {
    /// Interprets `HBNB_TYPE_STORAGE`: `db` selects the relational backend, anything else
    /// the file backend.
    #[must_use]
    pub fn from_setting(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("db") {
            Self::Db
        } else {
            Self::File
        }
    }
}

/// `[storage]` section of the settings file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Backend selector
    #[serde(rename = "type")]
    pub backend: BackendKind,
    /// JSON document used by the file backend
    pub file_path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: BackendKind::File,
            file_path: PathBuf::from(DEFAULT_FILE_PATH),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend selection and file location
    pub storage: StorageSection,
    /// Relational connection parameters
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Configuration for the file backend writing to `path`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageSection {
                backend: BackendKind::File,
                file_path: path.into(),
            },
            database: DatabaseConfig::default(),
        }
    }

    /// Configuration for the relational backend.
    #[must_use]
    pub fn db(database: DatabaseConfig) -> Self {
        Self {
            storage: StorageSection {
                backend: BackendKind::Db,
                ..StorageSection::default()
            },
            database,
        }
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `HBNB_MYSQL_PORT` is not a port number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("HBNB_TYPE_STORAGE") {
            self.storage.backend = BackendKind::from_setting(&value);
        }
        if let Some(value) = lookup("HBNB_FILE_PATH") {
            self.storage.file_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("HBNB_MYSQL_USER") {
            self.database.user = value;
        }
        if let Some(value) = lookup("HBNB_MYSQL_PWD") {
            self.database.password = value;
        }
        if let Some(value) = lookup("HBNB_MYSQL_HOST") {
            self.database.host = value;
        }
        if let Some(value) = lookup("HBNB_MYSQL_PORT") {
            let port = value.trim().parse().map_err(|e| Error::Config {
                message: format!("Invalid HBNB_MYSQL_PORT {value:?}: {e}"),
            })?;
            self.database.port = Some(port);
        }
        if let Some(value) = lookup("HBNB_MYSQL_DB") {
            self.database.name = value;
        }
        if let Some(value) = lookup("HBNB_DATABASE_URL") {
            self.database.url = Some(value);
        }
        self.database.test_mode = lookup("HBNB_ENV").is_some_and(|env| env == "test");
        Ok(())
    }
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be read or is not valid TOML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config file {path_ref:?}: {e}"),
    })
}

/// Loads the process configuration: the settings file if present, then the environment.
///
/// # Errors
/// Returns [`Error::Config`] if a settings file exists but cannot be parsed, or if an
/// environment override is malformed.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("HBNB_CONFIG").unwrap_or_else(|_| "hbnb.toml".to_string());
    let mut config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        debug!("No settings file at {path}, using defaults");
        AppConfig::default()
    };
    config.apply_overrides(|name| std::env::var(name).ok())?;
    Ok(config)
}
