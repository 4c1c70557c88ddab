//! # Domain Errors
//!
//! Error types for the snapshot & sync subsystem.
//!
//! Capture and storage errors on the serving side are recoverable (the next
//! eligible height retries); verification errors on the receiving side are
//! retryable per chunk; an app-hash mismatch is terminal for that snapshot.

use crate::domain::entities::Hash;
use thiserror::Error;

/// State sync error types.
#[derive(Debug, Error)]
pub enum StateSyncError {
    /// Capture requested for a height the store has not committed.
    #[error("height {requested} is not the committed height ({committed})")]
    NotCommitted { requested: u64, committed: u64 },

    /// A snapshot for this height already exists.
    #[error("snapshot already exists for height {height}")]
    AlreadyExists { height: u64 },

    /// No snapshot manifest for this height/format.
    #[error("no snapshot for height {height} (format {format})")]
    NotFound { height: u64, format: u32 },

    /// Chunk index unknown within a stored snapshot.
    #[error("chunk {index} not found for height {height}")]
    ChunkNotFound { height: u64, index: u32 },

    /// Aggregate hash over the received chunk hashes differs from the manifest.
    #[error("aggregate hash mismatch for snapshot at height {height}")]
    AggregateHashMismatch { height: u64 },

    /// Offered snapshot format is not supported.
    #[error("unsupported snapshot format {format} (supported: {supported})")]
    UnsupportedFormat { format: u32, supported: u32 },

    /// Assembled state's app hash disagrees with the declared target.
    ///
    /// Terminal for the snapshot: the node must fall back to historical
    /// replay rather than enter consensus on unverified state.
    #[error("app hash mismatch at height {height}: declared {declared:02x?}, got {computed:02x?}")]
    AppHashMismatch {
        height: u64,
        declared: Hash,
        computed: Hash,
    },

    /// Manifest/chunk persistence failure.
    #[error("snapshot store error: {0}")]
    Store(#[from] StoreError),

    /// Canonical encode/decode failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Compression or decompression failure.
    #[error("compression error: {0}")]
    Compression(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Storage-boundary errors (state store and chunk store adapters).
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure during read/write.
    #[error("I/O error: {0}")]
    Io(String),

    /// A stored record could not be decoded.
    #[error("corrupt record: {0}")]
    Corruption(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_committed_display() {
        let err = StateSyncError::NotCommitted {
            requested: 400,
            committed: 200,
        };
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("200"));
    }

    #[test]
    fn test_unsupported_format_display() {
        let err = StateSyncError::UnsupportedFormat {
            format: 7,
            supported: 1,
        };
        assert!(err.to_string().contains("format 7"));
    }

    #[test]
    fn test_store_error_conversion() {
        let store_err = StoreError::Io("disk failure".to_string());
        let err: StateSyncError = store_err.into();

        match err {
            StateSyncError::Store(inner) => assert!(inner.to_string().contains("disk failure")),
            other => panic!("expected Store, got {other:?}"),
        }
    }

    #[test]
    fn test_app_hash_mismatch_is_distinguishable() {
        let err = StateSyncError::AppHashMismatch {
            height: 1000,
            declared: [1; 32],
            computed: [2; 32],
        };
        assert!(matches!(err, StateSyncError::AppHashMismatch { .. }));
        assert!(err.to_string().contains("1000"));
    }
}
