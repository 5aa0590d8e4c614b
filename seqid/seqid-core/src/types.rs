//! Allocation records and store outcomes.

use crate::id::Identifier;
use crate::namespace::Namespace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who or what asked for an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Opaque user identifier issued by the identity provider
    pub owner: String,
    /// Owning entity reference (project or ticket document key)
    pub entity: Option<String>,
    /// Unique id of this allocation request
    pub request_id: Uuid,
}

impl RequestContext {
    /// Create a context for an owner with a fresh request id
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            entity: None,
            request_id: Uuid::new_v4(),
        }
    }

    /// Attach the owning entity reference
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

/// What the store keeps next to an issued identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub owner: RequestContext,
    pub allocated_at: DateTime<Utc>,
}

impl AllocationRecord {
    /// Create a record stamped with the current time
    pub fn new(owner: RequestContext) -> Self {
        Self {
            owner,
            allocated_at: Utc::now(),
        }
    }
}

/// An identifier as persisted by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAllocation {
    pub identifier: Identifier,
    pub namespace: Namespace,
    pub sequence: u64,
    pub record: AllocationRecord,
}

impl StoredAllocation {
    pub fn new(identifier: Identifier, record: AllocationRecord) -> Self {
        Self {
            namespace: identifier.namespace().clone(),
            sequence: identifier.sequence(),
            identifier,
            record,
        }
    }
}

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    /// The record was created
    Inserted,
    /// A record with the same identifier already exists
    AlreadyExists,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}
