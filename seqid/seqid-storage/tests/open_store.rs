//! Building stores from configuration.

use seqid_core::config::{DatabaseConfig, StoreMode};
use seqid_core::prelude::*;
use seqid_storage::open_store;
use std::path::PathBuf;
use tempfile::TempDir;

#[tokio::test]
async fn test_memory_mode_opens_in_process_store() {
    let store = open_store(&DatabaseConfig::memory()).await.unwrap();
    let allocator = SequencedAllocator::new(store);

    let id = allocator
        .allocate("Exam Portal", RequestContext::new("user-1"))
        .await
        .unwrap();
    assert_eq!(id.to_string(), "EP-1");
}

#[tokio::test]
async fn test_rocksdb_mode_allocates_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        mode: StoreMode::RocksDb,
        path: Some(temp_dir.path().join("seqid.db")),
        ..DatabaseConfig::default()
    };

    let store = open_store(&config).await.unwrap();
    let allocator = SequencedAllocator::new(store.clone());
    for expected in ["EP-1", "EP-2"] {
        let id = allocator
            .allocate("Exam Portal", RequestContext::new("user-1"))
            .await
            .unwrap();
        assert_eq!(id.to_string(), expected);
    }

    let listed = store.list_allocations(&Namespace::new("EP")).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(temp_dir.path().join("seqid.db").exists());
}

#[tokio::test]
async fn test_rocksdb_mode_requires_path() {
    let config = DatabaseConfig {
        mode: StoreMode::RocksDb,
        path: None::<PathBuf>,
        ..DatabaseConfig::default()
    };

    let err = open_store(&config).await.err().expect("missing path must fail");
    assert!(matches!(err, SeqIdError::Config(_)));
}
