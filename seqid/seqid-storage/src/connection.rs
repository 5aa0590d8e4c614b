//! Connection configuration for SurrealDB.

use seqid_core::config::{DatabaseConfig, StoreMode};
use seqid_core::error::{Result, SeqIdError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Connection mode for SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionMode {
    /// In-memory database (for testing)
    Memory,
    /// RocksDB file storage
    RocksDb { path: PathBuf },
    /// Remote server
    Remote { endpoint: String },
}

/// Configuration for SurrealDB connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub mode: ConnectionMode,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pool_size: usize,
}

impl ConnectionConfig {
    /// Create a new in-memory configuration (for testing)
    pub fn memory() -> Self {
        Self::with_mode(ConnectionMode::Memory)
    }

    /// Create a new RocksDB configuration
    pub fn rocksdb(path: PathBuf) -> Self {
        Self::with_mode(ConnectionMode::RocksDb { path })
    }

    /// Create a new remote configuration
    pub fn remote(endpoint: String) -> Self {
        Self::with_mode(ConnectionMode::Remote { endpoint })
    }

    fn with_mode(mode: ConnectionMode) -> Self {
        Self {
            mode,
            namespace: "seqid".to_string(),
            database: "main".to_string(),
            username: None,
            password: None,
            pool_size: 4,
        }
    }

    /// Build a connection config from the `[database]` section
    pub fn from_database_config(config: &DatabaseConfig) -> Result<Self> {
        let mode = match config.mode {
            StoreMode::Memory => ConnectionMode::Memory,
            StoreMode::RocksDb => ConnectionMode::RocksDb {
                path: config
                    .path
                    .clone()
                    .ok_or_else(|| SeqIdError::config("RocksDB mode requires database.path"))?,
            },
            StoreMode::Remote => ConnectionMode::Remote {
                endpoint: config
                    .endpoint
                    .clone()
                    .ok_or_else(|| SeqIdError::config("Remote mode requires database.endpoint"))?,
            },
        };

        let mut conn = Self::with_mode(mode)
            .with_namespace(config.namespace.clone())
            .with_database(config.database.clone());
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            conn = conn.with_auth(username.clone(), password.clone());
        }
        Ok(conn)
    }

    /// Set the namespace
    pub fn with_namespace(mut self, namespace: String) -> Self {
        self.namespace = namespace;
        self
    }

    /// Set the database name
    pub fn with_database(mut self, database: String) -> Self {
        self.database = database;
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    /// Set the connection pool size
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Number of connections the pool may actually open.
    ///
    /// Embedded engines get exactly one: every `mem://` connection is a
    /// separate database, and RocksDB allows a single open per directory.
    pub fn effective_pool_size(&self) -> usize {
        match self.mode {
            ConnectionMode::Memory | ConnectionMode::RocksDb { .. } => 1,
            ConnectionMode::Remote { .. } => self.pool_size,
        }
    }

    /// Get the connection string for SurrealDB
    pub fn connection_string(&self) -> Result<String> {
        match &self.mode {
            ConnectionMode::Memory => Ok("mem://".to_string()),
            ConnectionMode::RocksDb { path } => {
                let path_str = path
                    .to_str()
                    .ok_or_else(|| SeqIdError::config("Invalid path for RocksDB"))?;
                Ok(format!("rocksdb://{}", path_str))
            }
            ConnectionMode::Remote { endpoint } => Ok(endpoint.clone()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(SeqIdError::config("Namespace cannot be empty"));
        }
        if self.database.is_empty() {
            return Err(SeqIdError::config("Database name cannot be empty"));
        }
        if self.pool_size == 0 {
            return Err(SeqIdError::config("Pool size must be greater than 0"));
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::memory()
    }
}
