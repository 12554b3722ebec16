//! Configuration management for database instances
//!
//! A configuration file names one backend and its connection target:
//!
//! ```toml
//! prefix = "[Inventory] "
//!
//! [backend]
//! engine = "postgresql"
//! host = "localhost"
//! port = 5432
//! database = "inventory"
//!
//! [backend.credentials]
//! username = "app"
//! password = "secret"
//! ```
//!
//! JSON files carry the same structure.

use crate::DriverKind;
use crate::mysql::DEFAULT_MYSQL_PORT;
use crate::postgresql::DEFAULT_POSTGRES_PORT;
use crate::target::{Credentials, FileTarget, ServerTarget};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// On-disk encoding of a configuration file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    #[default]
    Toml,
}

impl ConfigFormat {
    /// Format implied by the file extension; TOML when there is none
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            None => Ok(ConfigFormat::Toml),
            Some(ext) => ext.parse(),
        }
    }
}

impl std::str::FromStr for ConfigFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ConfigFormat::Json),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat(s.to_string())),
        }
    }
}

fn default_postgres_port() -> u16 {
    DEFAULT_POSTGRES_PORT
}

fn default_mysql_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

/// Backend selection and connection target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "lowercase")]
pub enum BackendConfig {
    H2 {
        directory: PathBuf,
        filename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extension: Option<String>,
    },
    Sqlite {
        directory: PathBuf,
        filename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extension: Option<String>,
    },
    PostgreSql {
        host: String,
        #[serde(default = "default_postgres_port")]
        port: u16,
        database: String,
        #[serde(default)]
        credentials: Credentials,
    },
    MySql {
        host: String,
        #[serde(default = "default_mysql_port")]
        port: u16,
        database: String,
        #[serde(default)]
        credentials: Credentials,
    },
}

impl BackendConfig {
    pub fn driver(&self) -> DriverKind {
        match self {
            BackendConfig::H2 { .. } => DriverKind::H2,
            BackendConfig::Sqlite { .. } => DriverKind::SQLite,
            BackendConfig::PostgreSql { .. } => DriverKind::PostgreSQL,
            BackendConfig::MySql { .. } => DriverKind::MySQL,
        }
    }

    /// Check the connection target without touching the filesystem or network
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checked = match self {
            BackendConfig::H2 {
                directory,
                filename,
                extension,
            }
            | BackendConfig::Sqlite {
                directory,
                filename,
                extension,
            } => match extension {
                Some(ext) => FileTarget::with_extension(directory, filename, ext).map(|_| ()),
                None => FileTarget::new(directory, filename).map(|_| ()),
            },
            BackendConfig::PostgreSql {
                host,
                port,
                database,
                credentials,
            }
            | BackendConfig::MySql {
                host,
                port,
                database,
                credentials,
            } => ServerTarget::new(host, *port, database, credentials.clone()).map(|_| ()),
        };

        checked.map_err(|e| ConfigError::Invalid(format!("{} backend: {e}", self.driver())))
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Sqlite {
            directory: PathBuf::from("."),
            filename: "sqlhub".to_string(),
            extension: None,
        }
    }
}

/// Complete configuration of one database instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Caller log prefix, e.g. `"[Inventory] "`
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl DatabaseConfig {
    pub fn from_str_as(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
        }
    }

    pub fn to_string_as(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::Serialize(e.to_string())),
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
            }
        }
    }
}

/// Loads, validates and saves a [`DatabaseConfig`]
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: DatabaseConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Manager holding the default configuration and no backing file
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager backed by `path`; nothing is read until [`load_config`](Self::load_config)
    pub fn with_config_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config: DatabaseConfig::default(),
            config_path: Some(path.as_ref().to_path_buf()),
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Load the backing file; a missing file is created with the defaults
    pub fn load_config(&mut self) -> Result<(), ConfigError> {
        let Some(path) = self.config_path.clone() else {
            return Ok(());
        };

        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return self.save_config();
        }

        let format = ConfigFormat::from_path(&path)?;
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        self.config = DatabaseConfig::from_str_as(&content, format)?;

        info!("Loaded database configuration from {:?}", path);
        Ok(())
    }

    /// Write the current configuration to the backing file, if any
    pub fn save_config(&self) -> Result<(), ConfigError> {
        let Some(path) = self.config_path.as_deref() else {
            return Ok(());
        };

        let content = self.config.to_string_as(ConfigFormat::from_path(path)?)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Saved database configuration to {:?}", path);
        Ok(())
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DatabaseConfig {
        &mut self.config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.backend.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.prefix, "");
        assert_eq!(config.backend.driver(), DriverKind::SQLite);
        assert!(config.backend.validate().is_ok());
    }

    #[test]
    fn test_config_format_detection() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("db.json")).unwrap(),
            ConfigFormat::Json
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("db.TOML")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("sqlhub")).unwrap(),
            ConfigFormat::Toml
        );
        assert!(matches!(
            ConfigFormat::from_path(Path::new("db.yaml")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_server_backend_toml() {
        let content = r#"
prefix = "[Inventory] "

[backend]
engine = "postgresql"
host = "db.internal"
database = "inventory"

[backend.credentials]
username = "app"
password = "secret"
"#;
        let config = DatabaseConfig::from_str_as(content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.prefix, "[Inventory] ");
        assert_eq!(
            config.backend,
            BackendConfig::PostgreSql {
                host: "db.internal".to_string(),
                port: DEFAULT_POSTGRES_PORT,
                database: "inventory".to_string(),
                credentials: Credentials::new("app", "secret"),
            }
        );
    }

    #[test]
    fn test_parse_file_backend_json() {
        let content = r#"{"backend": {"engine": "h2", "directory": "/tmp", "filename": "mydb", "extension": "h2.db"}}"#;
        let config = DatabaseConfig::from_str_as(content, ConfigFormat::Json).unwrap();
        assert_eq!(config.backend.driver(), DriverKind::H2);
        assert!(config.backend.validate().is_ok());
    }

    #[test]
    fn test_parse_unknown_engine() {
        let content = "[backend]\nengine = \"oracle\"\n";
        assert!(matches!(
            DatabaseConfig::from_str_as(content, ConfigFormat::Toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        let mut manager = ConfigManager::new();
        assert!(manager.validate().is_ok());

        manager.config_mut().backend = BackendConfig::MySql {
            host: "localhost".to_string(),
            port: 0,
            database: "inventory".to_string(),
            credentials: Credentials::default(),
        };
        let err = manager.validate().err().unwrap();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: MySQL backend: Invalid connection target: port must be greater than 0"
        );

        manager.config_mut().backend = BackendConfig::Sqlite {
            directory: PathBuf::from("/tmp"),
            filename: "  ".to_string(),
            extension: None,
        };
        assert!(matches!(manager.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("sqlhub.toml");

        let mut manager = ConfigManager::with_config_file(&path);
        manager.load_config().unwrap();
        assert!(path.exists());
        assert_eq!(manager.config(), &DatabaseConfig::default());

        manager.config_mut().prefix = "[Saved] ".to_string();
        manager.save_config().unwrap();

        let mut reloaded = ConfigManager::with_config_file(&path);
        reloaded.load_config().unwrap();
        assert_eq!(reloaded.config().prefix, "[Saved] ");
    }

    #[test]
    fn test_credentials_are_redacted_in_debug() {
        let backend = BackendConfig::MySql {
            host: "localhost".to_string(),
            port: DEFAULT_MYSQL_PORT,
            database: "inventory".to_string(),
            credentials: Credentials::new("root", "hunter2"),
        };
        assert!(!format!("{backend:?}").contains("hunter2"));
    }
}
