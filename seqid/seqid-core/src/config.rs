//! Configuration for seqid.
//!
//! Configuration lives in `~/.seqid/config.toml` unless `SEQID_CONFIG_PATH`
//! points elsewhere. Values from the file can be overridden with `SEQID_*`
//! environment variables. Every section and every field is optional; missing
//! values take their defaults, which store identifiers in an embedded RocksDB
//! database under `~/.seqid/data`.
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [database]
//! mode = "rocksdb"
//! path = "/home/me/.seqid/data"
//! namespace = "seqid"
//! database = "main"
//!
//! [allocator]
//! max_attempts = 5
//! initial_backoff_ms = 10
//! max_backoff_ms = 250
//! multiplier = 2.0
//! ```

use crate::allocator::RetryPolicy;
use crate::error::{Result, SeqIdError};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

// Environment variable names
pub const ENV_CONFIG_PATH: &str = "SEQID_CONFIG_PATH";
pub const ENV_LOG_LEVEL: &str = "SEQID_LOG_LEVEL";
pub const ENV_DB_MODE: &str = "SEQID_DB_MODE";
pub const ENV_DB_URL: &str = "SEQID_DB_URL";
pub const ENV_DB_PATH: &str = "SEQID_DB_PATH";
pub const ENV_DB_NAMESPACE: &str = "SEQID_DB_NAMESPACE";
pub const ENV_DB_DATABASE: &str = "SEQID_DB_DATABASE";
pub const ENV_DB_USERNAME: &str = "SEQID_DB_USERNAME";
pub const ENV_DB_PASSWORD: &str = "SEQID_DB_PASSWORD";
pub const ENV_MAX_ATTEMPTS: &str = "SEQID_MAX_ATTEMPTS";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Where identifiers are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// Process-local store, lost on exit
    Memory,
    /// Embedded SurrealDB on RocksDB
    RocksDb,
    /// Remote SurrealDB server
    Remote,
}

impl StoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::RocksDb => "rocksdb",
            Self::Remote => "remote",
        }
    }
}

impl std::str::FromStr for StoreMode {
    type Err = SeqIdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::RocksDb),
            "remote" => Ok(Self::Remote),
            _ => Err(SeqIdError::Config(format!(
                "Invalid store mode '{}'. Must be one of: memory, rocksdb, remote",
                s
            ))),
        }
    }
}

impl std::fmt::Display for StoreMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeqIdConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub allocator: AllocatorConfig,
}

/// General configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub mode: StoreMode,
    /// Data directory for `rocksdb` mode
    pub path: Option<PathBuf>,
    /// Server endpoint for `remote` mode, e.g. `ws://127.0.0.1:8000`
    pub endpoint: Option<String>,
    /// SurrealDB namespace
    pub namespace: String,
    /// SurrealDB database name
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Allocation retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Attempts before giving up with `AllocationFailed`
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Embedded RocksDB under `~/.seqid/data`
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            mode: StoreMode::RocksDb,
            path: SeqIdConfig::default_data_dir(),
            endpoint: None,
            namespace: "seqid".to_string(),
            database: "main".to_string(),
            username: None,
            password: None,
        }
    }
}

impl DatabaseConfig {
    /// Process-local store, lost on exit
    pub fn memory() -> Self {
        Self {
            mode: StoreMode::Memory,
            path: None,
            ..Self::default()
        }
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            multiplier: policy.multiplier,
        }
    }
}

impl AllocatorConfig {
    /// Retry policy described by this section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
        }
    }
}

impl SeqIdConfig {
    /// Load configuration from the default location
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path).await
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SeqIdError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::import_toml(&content)?;
        config.merge_env_vars()?;
        config.validate()?;

        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from `path`, or the default location when `None`.
    ///
    /// A missing file yields the defaults with environment overrides applied.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        let exists = tokio::fs::try_exists(&path).await.map_err(|e| {
            SeqIdError::Config(format!("Failed to access {}: {}", path.display(), e))
        })?;

        if exists {
            Self::load_from_path(&path).await
        } else {
            debug!("No config at {}, using defaults", path.display());
            let mut config = Self::default();
            config.merge_env_vars()?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Save configuration to a specific path atomically
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or cannot be written
    pub async fn save_to_path(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        self.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    SeqIdError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = self.export_toml()?;

        // Atomic write: write to temp file, then rename
        let temp_path = path.with_extension("toml.tmp");

        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| SeqIdError::Config(format!("Failed to write config file: {}", e)))?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| SeqIdError::Config(format!("Failed to rename config file: {}", e)))?;

        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(SeqIdError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.general.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        let db = &self.database;
        match db.mode {
            StoreMode::Remote if db.endpoint.as_deref().is_none_or(str::is_empty) => {
                return Err(SeqIdError::config("Remote mode requires database.endpoint"));
            }
            StoreMode::RocksDb if db.path.is_none() => {
                return Err(SeqIdError::config("RocksDB mode requires database.path"));
            }
            _ => {}
        }
        if db.namespace.is_empty() {
            return Err(SeqIdError::config("Database namespace cannot be empty"));
        }
        if db.database.is_empty() {
            return Err(SeqIdError::config("Database name cannot be empty"));
        }
        if db.username.is_some() != db.password.is_some() {
            return Err(SeqIdError::config(
                "Database username and password must be set together",
            ));
        }

        let alloc = &self.allocator;
        if alloc.max_attempts == 0 {
            return Err(SeqIdError::config("allocator.max_attempts must be greater than 0"));
        }
        if !(alloc.multiplier >= 1.0) {
            return Err(SeqIdError::config("allocator.multiplier must be at least 1.0"));
        }
        if alloc.initial_backoff_ms > alloc.max_backoff_ms {
            return Err(SeqIdError::config(
                "allocator.initial_backoff_ms cannot exceed allocator.max_backoff_ms",
            ));
        }

        Ok(())
    }

    /// Merge environment variable overrides into the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Merge overrides from an arbitrary variable lookup
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(log_level) = lookup(ENV_LOG_LEVEL) {
            debug!("Overriding log_level from environment: {}", log_level);
            self.general.log_level = log_level;
        }

        if let Some(mode) = lookup(ENV_DB_MODE) {
            debug!("Overriding database mode from environment: {}", mode);
            self.database.mode = mode.parse()?;
        }

        if let Some(url) = lookup(ENV_DB_URL) {
            debug!("Overriding database endpoint from environment");
            self.database.endpoint = Some(url);
        }

        if let Some(path) = lookup(ENV_DB_PATH) {
            debug!("Overriding database path from environment: {}", path);
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(namespace) = lookup(ENV_DB_NAMESPACE) {
            self.database.namespace = namespace;
        }

        if let Some(database) = lookup(ENV_DB_DATABASE) {
            self.database.database = database;
        }

        if let Some(username) = lookup(ENV_DB_USERNAME) {
            debug!("Overriding database username from environment");
            self.database.username = Some(username);
        }

        if let Some(password) = lookup(ENV_DB_PASSWORD) {
            self.database.password = Some(password);
        }

        if let Some(attempts) = lookup(ENV_MAX_ATTEMPTS) {
            self.allocator.max_attempts = attempts.parse::<u32>().map_err(|e| {
                SeqIdError::Config(format!("Invalid max attempts in environment: {}", e))
            })?;
        }

        Ok(())
    }

    /// Get the base directory path (~/.seqid/)
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined
    pub fn base_dir() -> Result<PathBuf> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| SeqIdError::Config("Could not determine home directory".to_string()))?;

        Ok(base_dirs.home_dir().join(".seqid"))
    }

    /// Default RocksDB directory (~/.seqid/data), if the home directory is known
    pub fn default_data_dir() -> Option<PathBuf> {
        Self::base_dir().ok().map(|dir| dir.join("data"))
    }

    /// Get the configuration file path (~/.seqid/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
            return Ok(PathBuf::from(config_path));
        }

        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Export configuration as TOML
    pub fn export_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SeqIdError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Import configuration from TOML
    pub fn import_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| SeqIdError::Config(format!("Failed to parse config file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn create_temp_config_env() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        (temp_dir, config_path)
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = SeqIdConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.database.mode, StoreMode::RocksDb);
        assert_eq!(config.database.path, SeqIdConfig::default_data_dir());
        assert!(config.database.path.as_ref().unwrap().ends_with(".seqid/data"));
        assert_eq!(config.allocator.max_attempts, 5);
        assert!(config.validate().is_ok());
        assert_eq!(config.allocator.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SeqIdConfig::default();

        config.general.log_level = "loud".to_string();
        assert!(config.validate().is_err());
        config.general.log_level = "debug".to_string();

        config.database.mode = StoreMode::Remote;
        assert!(config.validate().is_err());
        config.database.endpoint = Some("ws://127.0.0.1:8000".to_string());
        assert!(config.validate().is_ok());

        config.database.mode = StoreMode::RocksDb;
        config.database.path = None;
        assert!(config.validate().is_err());
        config.database.path = Some(PathBuf::from("/tmp/seqid"));
        assert!(config.validate().is_ok());

        config.database.username = Some("root".to_string());
        assert!(config.validate().is_err());
        config.database.password = Some("root".to_string());
        assert!(config.validate().is_ok());

        config.allocator.max_attempts = 0;
        assert!(config.validate().is_err());
        config.allocator.max_attempts = 3;

        config.allocator.multiplier = 0.5;
        assert!(config.validate().is_err());
        config.allocator.multiplier = 1.0;

        config.allocator.initial_backoff_ms = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SeqIdConfig::import_toml(
            r#"
            [database]
            mode = "rocksdb"
            path = "/tmp/x"

            [allocator]
            max_attempts = 9
            "#,
        )
        .unwrap();

        assert_eq!(config.database.mode, StoreMode::RocksDb);
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/x")));
        assert_eq!(config.database.namespace, "seqid");
        assert_eq!(config.database.database, "main");
        assert_eq!(config.allocator.max_attempts, 9);
        assert_eq!(config.allocator.initial_backoff_ms, 10);
        assert_eq!(config.allocator.multiplier, 2.0);
        assert_eq!(config.general.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_general_section() {
        let config = SeqIdConfig::import_toml("[general]\n").unwrap();
        assert_eq!(config.general, GeneralConfig::default());
    }

    #[test]
    fn test_memory_database_config() {
        let db = DatabaseConfig::memory();
        assert_eq!(db.mode, StoreMode::Memory);
        assert_eq!(db.path, None);
        assert_eq!(db.namespace, "seqid");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_config_dir_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let (temp_dir, _) = create_temp_config_env();
        let locked = temp_dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let path = locked.join("config.toml");
        let result = SeqIdConfig::load_or_default(Some(&path)).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        // root ignores permission bits and sees a missing file
        if let Err(err) = result {
            assert!(matches!(err, SeqIdError::Config(_)));
            assert!(err.to_string().contains("Failed to access"));
        }
    }

    #[tokio::test]
    async fn test_missing_config_uses_defaults() {
        let (_temp_dir, config_path) = create_temp_config_env();
        let config = SeqIdConfig::load_or_default(Some(&config_path)).await.unwrap();
        assert_eq!(config.allocator, AllocatorConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SeqIdConfig::default();
        let env = vars(&[
            (ENV_LOG_LEVEL, "debug"),
            (ENV_DB_MODE, "remote"),
            (ENV_DB_URL, "ws://db:8000"),
            (ENV_MAX_ATTEMPTS, "8"),
        ]);

        config.merge_env_with(|key| env.get(key).cloned()).unwrap();

        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.database.mode, StoreMode::Remote);
        assert_eq!(config.database.endpoint.as_deref(), Some("ws://db:8000"));
        assert_eq!(config.allocator.max_attempts, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = SeqIdConfig::default();
        let env = vars(&[(ENV_MAX_ATTEMPTS, "many")]);
        assert!(config.merge_env_with(|key| env.get(key).cloned()).is_err());

        let env = vars(&[(ENV_DB_MODE, "sqlite")]);
        assert!(config.merge_env_with(|key| env.get(key).cloned()).is_err());
    }

    #[tokio::test]
    async fn test_save_and_load_config() {
        let (_temp_dir, config_path) = create_temp_config_env();

        let mut config = SeqIdConfig::default();
        config.general.log_level = "warn".to_string();
        config.database.namespace = "tickets".to_string();
        config.save_to_path(&config_path).await.unwrap();

        let loaded = SeqIdConfig::import_toml(
            &tokio::fs::read_to_string(&config_path).await.unwrap(),
        )
        .unwrap();
        assert_eq!(loaded, config);

        // temp file cleaned up by the rename
        assert!(!config_path.with_extension("toml.tmp").exists());
    }

    #[tokio::test]
    async fn test_invalid_config_is_not_saved() {
        let (_temp_dir, config_path) = create_temp_config_env();

        let mut config = SeqIdConfig::default();
        config.allocator.max_attempts = 0;

        assert!(config.save_to_path(&config_path).await.is_err());
        assert!(!config_path.exists());
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let (_temp_dir, config_path) = create_temp_config_env();
        tokio::fs::write(&config_path, "[general\nlog_level = ")
            .await
            .unwrap();

        let err = SeqIdConfig::load_from_path(&config_path).await.unwrap_err();
        assert!(matches!(err, SeqIdError::Config(_)));
    }

    #[test]
    fn test_store_mode_parsing() {
        assert_eq!("Memory".parse::<StoreMode>().unwrap(), StoreMode::Memory);
        assert_eq!("rocksdb".parse::<StoreMode>().unwrap(), StoreMode::RocksDb);
        assert_eq!(StoreMode::Remote.to_string(), "remote");
        assert!("postgres".parse::<StoreMode>().is_err());
    }
}
