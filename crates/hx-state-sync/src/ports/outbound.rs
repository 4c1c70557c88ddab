//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the snapshot & sync service requires the host application
//! to implement.

use crate::domain::entities::SnapshotManifest;
use crate::domain::errors::{StateSyncError, StoreError};

/// Batch operation for atomic writes.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// Storage-engine boundary: the application keyspace.
///
/// Production backs this with the node's storage engine; tests use
/// `InMemoryStateStore`.
pub trait StateStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key.
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Execute an atomic batch write: either ALL operations are applied, or
    /// none. Restore correctness rests on this guarantee.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;
}

/// Snapshot artifact persistence, keyed by height and `(height, index)`.
pub trait ChunkStore: Send + Sync {
    /// Persist a manifest. Written after its chunks so discovery never sees
    /// a partially stored snapshot.
    fn put_manifest(&mut self, manifest: &SnapshotManifest) -> Result<(), StoreError>;

    /// Load the manifest for a height, if any.
    fn get_manifest(&self, height: u64) -> Result<Option<SnapshotManifest>, StoreError>;

    /// Every stored manifest; no ordering guarantee.
    fn list_manifests(&self) -> Result<Vec<SnapshotManifest>, StoreError>;

    /// Persist one chunk payload.
    fn put_chunk(&mut self, height: u64, index: u32, payload: &[u8]) -> Result<(), StoreError>;

    /// Load one chunk payload, if present.
    fn get_chunk(&self, height: u64, index: u32) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove the manifest and every chunk for a height. The manifest goes
    /// first so the snapshot disappears from discovery before its chunks do.
    fn delete_snapshot(&mut self, height: u64) -> Result<(), StoreError>;
}

/// Snapshot payload compression codec.
pub trait Compressor: Send + Sync {
    /// Compress encoded snapshot bytes.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, StateSyncError>;

    /// Decompress a reassembled snapshot payload.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, StateSyncError>;
}
