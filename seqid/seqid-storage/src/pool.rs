//! Connection pooling for SurrealDB.

use crate::connection::ConnectionConfig;
use dashmap::DashMap;
use seqid_core::error::{Result, SeqIdError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tokio::sync::Mutex;

/// A connection pool for SurrealDB clients.
///
/// Connections are opened up to the pool size, at most once each, and then
/// handed out round-robin.
pub struct ConnectionPool {
    config: ConnectionConfig,
    connections: DashMap<usize, Arc<Surreal<Any>>>,
    /// Held while opening connections
    fill_lock: Mutex<()>,
    cursor: AtomicUsize,
    max_size: usize,
}

impl ConnectionPool {
    /// Create a new connection pool
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let max_size = config.effective_pool_size();

        Ok(Self {
            config,
            connections: DashMap::new(),
            fill_lock: Mutex::new(()),
            cursor: AtomicUsize::new(0),
            max_size,
        })
    }

    /// Open connections until the pool is full
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.fill_lock.lock().await;

        if self.connections.len() < self.max_size {
            tracing::info!(
                "Initializing connection pool with {} connections",
                self.max_size
            );
        }

        while self.connections.len() < self.max_size {
            let db = self.create_connection().await?;
            self.connections.insert(self.connections.len(), db);
        }

        Ok(())
    }

    /// Create a new connection
    async fn create_connection(&self) -> Result<Arc<Surreal<Any>>> {
        let conn_str = self.config.connection_string()?;

        tracing::debug!("Creating new SurrealDB connection: {}", conn_str);

        let db = surrealdb::engine::any::connect(conn_str)
            .await
            .map_err(|e| SeqIdError::store_unavailable(format!("Failed to connect: {}", e)))?;

        // Authenticate before selecting namespace/database
        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            db.signin(surrealdb::opt::auth::Root {
                username,
                password,
            })
            .await
            .map_err(|e| SeqIdError::store_unavailable(format!("Authentication failed: {}", e)))?;
        }

        db.use_ns(&self.config.namespace)
            .use_db(&self.config.database)
            .await
            .map_err(|e| {
                SeqIdError::store_unavailable(format!("Failed to use namespace/database: {}", e))
            })?;

        Ok(Arc::new(db))
    }

    /// Get a connection from the pool, filling it first if needed
    pub async fn get(&self) -> Result<Arc<Surreal<Any>>> {
        if self.connections.len() < self.max_size {
            self.initialize().await?;
        }

        let slot = self.cursor.fetch_add(1, Ordering::Relaxed) % self.max_size;
        self.connections
            .get(&slot)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SeqIdError::store_unavailable(format!("No connection in slot {}", slot)))
    }

    /// Number of open connections
    pub fn size(&self) -> usize {
        self.connections.len()
    }

    /// Get the maximum pool size
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
