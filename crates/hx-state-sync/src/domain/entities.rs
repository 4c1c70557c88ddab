//! # Domain Entities
//!
//! Snapshot manifests, discovery descriptors, and the canonical state image.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hash type alias (32-byte SHA-256).
pub type Hash = [u8; 32];

/// Current snapshot format version.
///
/// Format 1 covers the canonical image encoding (bincode over ordered maps,
/// lexicographic key order) and the zstd-then-split chunk pipeline. Any
/// change to the ordering, codec, or compression requires a bump, otherwise
/// independently built nodes disagree on content hashes.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Key namespaces within the application keyspace.
///
/// The storage engine itself is namespace-agnostic; these prefixes carve out
/// the regions the snapshot subsystem captures and restores.
pub struct KeyPrefix;

impl KeyPrefix {
    /// Application state entries.
    pub const STATE: &'static [u8] = b"s:";
    /// Per-sender nonce counters (u64 little-endian values).
    pub const NONCE: &'static [u8] = b"n:";
    /// Latest committed height cursor (u64 little-endian).
    pub const META_HEIGHT: &'static [u8] = b"m:height";
    /// App hash at the latest committed height.
    pub const META_APP_HASH: &'static [u8] = b"m:app_hash";
    /// Block time at the latest committed height (unix seconds).
    pub const META_BLOCK_TIME: &'static [u8] = b"m:block_time";

    /// Full key for a state entry.
    pub fn state_key(key: &[u8]) -> Vec<u8> {
        [Self::STATE, key].concat()
    }

    /// Full key for a sender's nonce counter.
    pub fn nonce_key(sender: &str) -> Vec<u8> {
        [Self::NONCE, sender.as_bytes()].concat()
    }
}

/// Block metadata embedded in a captured state image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Height the image was captured at.
    pub height: u64,
    /// Consensus-agreed app hash at that height.
    pub app_hash: Hash,
    /// Block time at that height (unix seconds).
    pub block_time: u64,
}

/// Canonical point-in-time capture of the full application state.
///
/// `BTreeMap` fixes the entry order (lexicographic by key, senders likewise),
/// so encoding the same committed state twice yields identical bytes. That
/// ordering is part of [`SNAPSHOT_FORMAT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateImage {
    /// Every key-value entry in the state namespace (namespace prefix stripped).
    pub entries: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Every sender's nonce counter.
    pub nonces: BTreeMap<String, u64>,
    /// Height / app hash / block time the image belongs to.
    pub metadata: ImageMetadata,
}

/// Persisted record describing one snapshot (one manifest per height).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    /// Height the snapshot captures.
    pub height: u64,
    /// Snapshot format version.
    pub format: u32,
    /// Block time at `height` (unix seconds).
    pub block_time: u64,
    /// Declared app hash the restored state must reproduce.
    #[serde(with = "hex_hash")]
    pub app_hash: Hash,
    /// Content hash of every chunk, in index order.
    #[serde(with = "hex_hash_list")]
    pub chunk_hashes: Vec<Hash>,
    /// SHA-256 over the ordered chunk-hash list.
    #[serde(with = "hex_hash")]
    pub aggregate_hash: Hash,
}

impl SnapshotManifest {
    /// Number of chunks in this snapshot.
    pub fn chunk_count(&self) -> u32 {
        self.chunk_hashes.len() as u32
    }

    /// The discovery-time advertisement for this snapshot.
    pub fn descriptor(&self) -> SnapshotDescriptor {
        SnapshotDescriptor {
            height: self.height,
            format: self.format,
            chunk_count: self.chunk_count(),
            aggregate_hash: self.aggregate_hash,
            app_hash: self.app_hash,
            chunk_hashes: self.chunk_hashes.clone(),
        }
    }
}

/// Snapshot advertisement exchanged during discovery. Carries no payload.
///
/// `chunk_hashes` rides in the wire snapshot's opaque metadata field; the
/// receiving side needs it to verify each chunk on arrival, before the full
/// set is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDescriptor {
    pub height: u64,
    pub format: u32,
    pub chunk_count: u32,
    pub aggregate_hash: Hash,
    pub app_hash: Hash,
    pub chunk_hashes: Vec<Hash>,
}

/// Serde helpers for hex-encoded hashes in JSON manifests.
mod hex_hash {
    use super::Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let bytes = hex::decode(&raw).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected a 32-byte hash"))
    }
}

mod hex_hash_list {
    use super::Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hashes: &[Hash], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<String> = hashes.iter().map(hex::encode).collect();
        serde::Serialize::serialize(&encoded, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Hash>, D::Error> {
        let raw: Vec<String> = Vec::deserialize(deserializer)?;
        raw.into_iter()
            .map(|s| {
                let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
                bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("expected a 32-byte hash"))
            })
            .collect()
    }
}
