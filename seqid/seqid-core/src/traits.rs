//! Store interface consumed by the allocator.

use crate::error::Result;
use crate::id::Identifier;
use crate::namespace::Namespace;
use crate::types::{AllocationRecord, InsertOutcome, StoredAllocation};
use async_trait::async_trait;

/// Trait for identifier stores.
///
/// Every operation fails with [`SeqIdError::StoreUnavailable`] when the
/// backing persistence layer cannot be reached.
///
/// [`SeqIdError::StoreUnavailable`]: crate::error::SeqIdError::StoreUnavailable
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentifierStore: Send + Sync {
    /// Snapshot of the identifiers issued in a namespace, in no particular order
    async fn list_identifiers(&self, namespace: &Namespace) -> Result<Vec<Identifier>>;

    /// Create the record keyed by `identifier` unless one already exists.
    ///
    /// The existence check and the write must be atomic at the store.
    async fn try_insert(
        &self,
        identifier: &Identifier,
        record: &AllocationRecord,
    ) -> Result<InsertOutcome>;

    /// Look up an issued identifier
    async fn get_allocation(&self, identifier: &Identifier) -> Result<Option<StoredAllocation>>;

    /// Allocations of a namespace ordered by sequence
    async fn list_allocations(&self, namespace: &Namespace) -> Result<Vec<StoredAllocation>>;
}
