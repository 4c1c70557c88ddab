//! # Chunking & Hashing
//!
//! Fixed-size chunk split plus the hash scheme tying a snapshot together:
//! each chunk is SHA-256 hashed, and the aggregate hash over the ordered
//! chunk-hash list fingerprints the whole snapshot.

use crate::domain::entities::Hash;
use sha2::{Digest, Sha256};

/// SHA-256 content hash of a chunk payload.
pub fn chunk_hash(payload: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hasher.finalize().into()
}

/// SHA-256 over the ordered per-chunk hash list.
pub fn aggregate_hash(chunk_hashes: &[Hash]) -> Hash {
    let mut hasher = Sha256::new();
    for hash in chunk_hashes {
        hasher.update(hash);
    }
    hasher.finalize().into()
}

/// Split compressed snapshot bytes into `chunk_size` pieces.
///
/// The final chunk may be shorter. Empty input still yields one empty chunk
/// so every snapshot advertises at least one chunk.
pub fn split_chunks(data: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    if data.is_empty() {
        return vec![Vec::new()];
    }
    data.chunks(chunk_size).map(|chunk| chunk.to_vec()).collect()
}
