//! # In-Memory Adapters

use crate::domain::capture::encode_u64;
use crate::domain::entities::{Hash, KeyPrefix, SnapshotManifest};
use crate::domain::errors::StoreError;
use crate::ports::outbound::{BatchOperation, ChunkStore, StateStore};
use std::collections::{BTreeMap, HashMap};

/// In-memory application keyspace.
///
/// A `BTreeMap` keeps keys ordered, so prefix scans come back in ascending
/// key order as the port requires. Production uses the node's storage
/// engine behind the same trait.
#[derive(Default)]
pub struct InMemoryStateStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed block by advancing the metadata cursors, the way
    /// the host's commit path does.
    pub fn commit_block(&mut self, height: u64, app_hash: Hash, block_time: u64) {
        self.data
            .insert(KeyPrefix::META_HEIGHT.to_vec(), encode_u64(height).to_vec());
        self.data
            .insert(KeyPrefix::META_APP_HASH.to_vec(), app_hash.to_vec());
        self.data.insert(
            KeyPrefix::META_BLOCK_TIME.to_vec(),
            encode_u64(block_time).to_vec(),
        );
    }
}

impl StateStore for InMemoryStateStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.data.remove(key);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let results: Vec<_> = self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        // Single-threaded map: applying in order is already atomic.
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// In-memory snapshot artifact store for tests and embedded use.
#[derive(Default)]
pub struct InMemoryChunkStore {
    manifests: BTreeMap<u64, SnapshotManifest>,
    chunks: HashMap<(u64, u32), Vec<u8>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkStore for InMemoryChunkStore {
    fn put_manifest(&mut self, manifest: &SnapshotManifest) -> Result<(), StoreError> {
        self.manifests.insert(manifest.height, manifest.clone());
        Ok(())
    }

    fn get_manifest(&self, height: u64) -> Result<Option<SnapshotManifest>, StoreError> {
        Ok(self.manifests.get(&height).cloned())
    }

    fn list_manifests(&self) -> Result<Vec<SnapshotManifest>, StoreError> {
        Ok(self.manifests.values().cloned().collect())
    }

    fn put_chunk(&mut self, height: u64, index: u32, payload: &[u8]) -> Result<(), StoreError> {
        self.chunks.insert((height, index), payload.to_vec());
        Ok(())
    }

    fn get_chunk(&self, height: u64, index: u32) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.chunks.get(&(height, index)).cloned())
    }

    fn delete_snapshot(&mut self, height: u64) -> Result<(), StoreError> {
        self.manifests.remove(&height);
        self.chunks.retain(|(h, _), _| *h != height);
        Ok(())
    }
}
