//! Identifier stores for seqid.
//!
//! Provides the process-local [`InMemoryIdentifierStore`] and the SurrealDB
//! backed [`SurrealIdentifierStore`], plus [`open_store`] to build whichever
//! one a [`DatabaseConfig`] describes.

pub mod connection;
pub mod memory;
pub mod pool;
pub mod schema;
pub mod surreal;

pub use connection::{ConnectionConfig, ConnectionMode};
pub use memory::InMemoryIdentifierStore;
pub use pool::ConnectionPool;
pub use surreal::SurrealIdentifierStore;

use seqid_core::config::{DatabaseConfig, StoreMode};
use seqid_core::error::Result;
use seqid_core::traits::IdentifierStore;
use std::sync::Arc;

/// Open the store described by the `[database]` configuration section.
///
/// `memory` mode yields an [`InMemoryIdentifierStore`]; `rocksdb` and
/// `remote` connect to SurrealDB and make sure the schema exists.
///
/// # Errors
///
/// Returns `StoreUnavailable` if the database cannot be reached
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn IdentifierStore>> {
    match config.mode {
        StoreMode::Memory => {
            tracing::debug!("Using in-memory identifier store");
            Ok(Arc::new(InMemoryIdentifierStore::new()))
        }
        StoreMode::RocksDb | StoreMode::Remote => {
            let conn = ConnectionConfig::from_database_config(config)?;
            let pool = Arc::new(ConnectionPool::new(conn)?);
            let store = SurrealIdentifierStore::with_schema(pool).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::connection::{ConnectionConfig, ConnectionMode};
    pub use crate::memory::InMemoryIdentifierStore;
    pub use crate::open_store;
    pub use crate::pool::ConnectionPool;
    pub use crate::surreal::SurrealIdentifierStore;
}
