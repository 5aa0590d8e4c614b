//! Database schema definitions.

use seqid_core::error::{Result, SeqIdError};

/// Table holding one record per issued identifier; the record id is the
/// identifier itself, `scope` holds the namespace code and `seq` the
/// sequence number.
pub const ALLOCATION_TABLE: &str = "allocation";

/// SurrealQL schema for identifier allocations
pub const SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS allocation SCHEMALESS;

DEFINE FIELD IF NOT EXISTS identifier ON allocation TYPE string;
DEFINE FIELD IF NOT EXISTS scope ON allocation TYPE string;
DEFINE FIELD IF NOT EXISTS seq ON allocation TYPE int;

DEFINE INDEX IF NOT EXISTS allocation_scope ON allocation FIELDS scope;
DEFINE INDEX IF NOT EXISTS allocation_scope_seq ON allocation FIELDS scope, seq UNIQUE;
"#;

/// Initialize the database schema
pub async fn init_schema(db: &surrealdb::Surreal<impl surrealdb::Connection>) -> Result<()> {
    tracing::info!("Initializing database schema");

    db.query(SCHEMA)
        .await
        .and_then(|response| response.check())
        .map_err(|e| SeqIdError::store_unavailable(format!("Failed to initialize schema: {}", e)))?;

    tracing::info!("Database schema initialized successfully");
    Ok(())
}
