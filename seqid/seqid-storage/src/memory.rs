//! Process-local identifier store.
//!
//! Backed by a `DashMap` keyed by identifier; the conditional insert goes
//! through the entry API, which holds the shard lock across the existence
//! check and the write.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use seqid_core::error::{Result, SeqIdError};
use seqid_core::id::Identifier;
use seqid_core::namespace::Namespace;
use seqid_core::traits::IdentifierStore;
use seqid_core::types::{AllocationRecord, InsertOutcome, StoredAllocation};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

/// In-memory identifier store
#[derive(Debug)]
pub struct InMemoryIdentifierStore {
    records: DashMap<String, StoredAllocation>,
    available: AtomicBool,
    inserts_attempted: AtomicU64,
}

impl InMemoryIdentifierStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            available: AtomicBool::new(true),
            inserts_attempted: AtomicU64::new(0),
        }
    }

    /// Mark the store reachable or unreachable.
    ///
    /// While unreachable every operation fails with `StoreUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `try_insert` calls seen so far, including conflicts
    pub fn inserts_attempted(&self) -> u64 {
        self.inserts_attempted.load(Ordering::SeqCst)
    }

    /// Total number of stored allocations
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SeqIdError::store_unavailable("in-memory store marked unavailable"))
        }
    }
}

impl Default for InMemoryIdentifierStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentifierStore for InMemoryIdentifierStore {
    async fn list_identifiers(&self, namespace: &Namespace) -> Result<Vec<Identifier>> {
        self.ensure_available()?;

        Ok(self
            .records
            .iter()
            .filter(|entry| entry.namespace == *namespace)
            .map(|entry| entry.identifier.clone())
            .collect())
    }

    async fn try_insert(
        &self,
        identifier: &Identifier,
        record: &AllocationRecord,
    ) -> Result<InsertOutcome> {
        self.ensure_available()?;
        self.inserts_attempted.fetch_add(1, Ordering::SeqCst);

        match self.records.entry(identifier.to_string()) {
            Entry::Occupied(_) => {
                debug!("{} already present", identifier);
                Ok(InsertOutcome::AlreadyExists)
            }
            Entry::Vacant(slot) => {
                slot.insert(StoredAllocation::new(identifier.clone(), record.clone()));
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn get_allocation(&self, identifier: &Identifier) -> Result<Option<StoredAllocation>> {
        self.ensure_available()?;
        Ok(self
            .records
            .get(&identifier.to_string())
            .map(|entry| entry.value().clone()))
    }

    async fn list_allocations(&self, namespace: &Namespace) -> Result<Vec<StoredAllocation>> {
        self.ensure_available()?;

        let mut allocations: Vec<StoredAllocation> = self
            .records
            .iter()
            .filter(|entry| entry.namespace == *namespace)
            .map(|entry| entry.value().clone())
            .collect();
        allocations.sort_by_key(|allocation| allocation.sequence);
        Ok(allocations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqid_core::types::RequestContext;

    fn record() -> AllocationRecord {
        AllocationRecord::new(RequestContext::new("user-1"))
    }

    #[tokio::test]
    async fn test_conditional_insert() {
        let store = InMemoryIdentifierStore::new();
        let id = Identifier::parse("EP-1").unwrap();

        assert_eq!(store.try_insert(&id, &record()).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.try_insert(&id, &record()).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.inserts_attempted(), 2);
    }

    #[tokio::test]
    async fn test_listing_is_scoped_to_namespace() {
        let store = InMemoryIdentifierStore::new();
        for id in ["EP-1", "EP-2", "E-1", "EPX-1"] {
            let id = Identifier::parse(id).unwrap();
            store.try_insert(&id, &record()).await.unwrap();
        }

        let mut listed: Vec<String> = store
            .list_identifiers(&Namespace::new("EP"))
            .await
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        listed.sort();
        assert_eq!(listed, vec!["EP-1", "EP-2"]);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = InMemoryIdentifierStore::new();
        store.set_available(false);

        let err = store
            .list_identifiers(&Namespace::new("EP"))
            .await
            .unwrap_err();
        assert!(err.is_store_unavailable());

        let id = Identifier::parse("EP-1").unwrap();
        assert!(store.try_insert(&id, &record()).await.is_err());
        assert_eq!(store.inserts_attempted(), 0);

        store.set_available(true);
        assert!(store.try_insert(&id, &record()).await.is_ok());
    }

    #[tokio::test]
    async fn test_allocations_sorted_by_sequence() {
        let store = InMemoryIdentifierStore::new();
        for id in ["HR-3", "HR-1", "HR-2"] {
            let id = Identifier::parse(id).unwrap();
            store.try_insert(&id, &record()).await.unwrap();
        }

        let sequences: Vec<u64> = store
            .list_allocations(&Namespace::new("HR"))
            .await
            .unwrap()
            .iter()
            .map(|a| a.sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3]);

        let found = store
            .get_allocation(&Identifier::parse("HR-2").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.record.owner.owner, "user-1");
    }
}
