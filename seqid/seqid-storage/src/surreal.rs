//! SurrealDB identifier store.
//!
//! Each issued identifier is a record in the `allocation` table whose record
//! id is the identifier text. `CREATE` refuses to overwrite an existing record
//! id, which gives the atomic check-and-set the allocator relies on; the
//! unique `(scope, seq)` index enforces the same invariant again at
//! the index level.

use crate::pool::ConnectionPool;
use crate::schema::ALLOCATION_TABLE;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use seqid_core::error::{Result, SeqIdError};
use seqid_core::id::Identifier;
use seqid_core::namespace::Namespace;
use seqid_core::traits::IdentifierStore;
use seqid_core::types::{AllocationRecord, InsertOutcome, RequestContext, StoredAllocation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Persisted shape of an allocation. Kept to plain strings and integers so it
/// maps onto SurrealDB values without custom types.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AllocationRow {
    identifier: String,
    #[serde(rename = "scope")]
    namespace: String,
    #[serde(rename = "seq")]
    sequence: u64,
    owner: String,
    #[serde(default)]
    entity: Option<String>,
    request_id: String,
    allocated_at: String,
}

impl AllocationRow {
    fn new(identifier: &Identifier, record: &AllocationRecord) -> Self {
        Self {
            identifier: identifier.to_string(),
            namespace: identifier.namespace().to_string(),
            sequence: identifier.sequence(),
            owner: record.owner.owner.clone(),
            entity: record.owner.entity.clone(),
            request_id: record.owner.request_id.to_string(),
            allocated_at: record.allocated_at.to_rfc3339(),
        }
    }

    fn into_allocation(self) -> Result<StoredAllocation> {
        let identifier = Identifier::parse(&self.identifier)?;
        let request_id = Uuid::parse_str(&self.request_id).map_err(|e| {
            SeqIdError::store_unavailable(format!("Corrupt request id on {}: {}", self.identifier, e))
        })?;
        let allocated_at = DateTime::parse_from_rfc3339(&self.allocated_at)
            .map_err(|e| {
                SeqIdError::store_unavailable(format!("Corrupt timestamp on {}: {}", self.identifier, e))
            })?
            .with_timezone(&Utc);

        let record = AllocationRecord {
            owner: RequestContext {
                owner: self.owner,
                entity: self.entity,
                request_id,
            },
            allocated_at,
        };
        Ok(StoredAllocation::new(identifier, record))
    }
}

#[derive(Debug, Deserialize)]
struct IdentifierRow {
    identifier: String,
}

/// Whether a database error means another writer got to the key first.
///
/// Besides the record and unique-index violations this includes optimistic
/// transaction conflicts, which the storage engine raises when two `CREATE`s
/// on the same key overlap.
fn is_conflict(err: &surrealdb::Error) -> bool {
    use surrealdb::error::Db;

    if let surrealdb::Error::Db(Db::RecordExists { .. } | Db::IndexExists { .. }) = err {
        return true;
    }

    // Remote engines report conflicts as plain messages
    is_conflict_message(&err.to_string())
}

fn is_conflict_message(msg: &str) -> bool {
    msg.contains("already exists")
        || msg.contains("already contains")
        || msg.contains("can be retried")
}

/// Identifier store implementation using SurrealDB
pub struct SurrealIdentifierStore {
    pool: Arc<ConnectionPool>,
}

impl SurrealIdentifierStore {
    /// Create a new SurrealDB store instance
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Open the pool's connections and initialize the schema
    pub async fn with_schema(pool: Arc<ConnectionPool>) -> Result<Self> {
        pool.initialize().await?;
        let conn = pool.get().await?;
        crate::schema::init_schema(&*conn).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl IdentifierStore for SurrealIdentifierStore {
    async fn list_identifiers(&self, namespace: &Namespace) -> Result<Vec<Identifier>> {
        let db = self.pool.get().await?;

        let mut result = db
            .query("SELECT identifier FROM type::table($table) WHERE scope = $namespace")
            .bind(("table", ALLOCATION_TABLE))
            .bind(("namespace", namespace.to_string()))
            .await
            .map_err(|e| SeqIdError::store_unavailable(format!("Failed to list identifiers: {}", e)))?;

        let rows: Vec<IdentifierRow> = result.take(0).map_err(|e| {
            SeqIdError::store_unavailable(format!("Failed to parse identifiers: {}", e))
        })?;

        rows.iter()
            .map(|row| Identifier::parse(&row.identifier))
            .collect()
    }

    async fn try_insert(
        &self,
        identifier: &Identifier,
        record: &AllocationRecord,
    ) -> Result<InsertOutcome> {
        let db = self.pool.get().await?;

        let created: std::result::Result<Option<AllocationRow>, surrealdb::Error> = db
            .create((ALLOCATION_TABLE, identifier.to_string()))
            .content(AllocationRow::new(identifier, record))
            .await;

        match created {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_conflict(&e) => {
                debug!("{} already present: {}", identifier, e);
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(SeqIdError::store_unavailable(format!(
                "Failed to create {}: {}",
                identifier, e
            ))),
        }
    }

    async fn get_allocation(&self, identifier: &Identifier) -> Result<Option<StoredAllocation>> {
        let db = self.pool.get().await?;

        let row: Option<AllocationRow> = db
            .select((ALLOCATION_TABLE, identifier.to_string()))
            .await
            .map_err(|e| SeqIdError::store_unavailable(format!("Failed to get allocation: {}", e)))?;

        row.map(AllocationRow::into_allocation).transpose()
    }

    async fn list_allocations(&self, namespace: &Namespace) -> Result<Vec<StoredAllocation>> {
        let db = self.pool.get().await?;

        let mut result = db
            .query(
                "SELECT identifier, scope, seq, owner, entity, request_id, allocated_at \
                 FROM type::table($table) WHERE scope = $namespace ORDER BY seq ASC",
            )
            .bind(("table", ALLOCATION_TABLE))
            .bind(("namespace", namespace.to_string()))
            .await
            .map_err(|e| SeqIdError::store_unavailable(format!("Failed to list allocations: {}", e)))?;

        let rows: Vec<AllocationRow> = result.take(0).map_err(|e| {
            SeqIdError::store_unavailable(format!("Failed to parse allocations: {}", e))
        })?;

        rows.into_iter().map(AllocationRow::into_allocation).collect()
    }
}
