//! # Snapshot Compression
//!
//! Zstd compression for the encoded state image. The codec choice is bound
//! to the snapshot format version: all nodes must compress identically for
//! chunk hashes to agree.

use crate::domain::errors::StateSyncError;
use crate::ports::outbound::Compressor;

/// Zstd-based compressor.
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    /// Create a compressor at the given level (1-22).
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, StateSyncError> {
        zstd::encode_all(data, self.level).map_err(|e| StateSyncError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, StateSyncError> {
        zstd::decode_all(data).map_err(|e| StateSyncError::Compression(e.to_string()))
    }
}

/// No-op compressor that returns data unchanged. Test use only; it does not
/// interoperate with zstd-format snapshots.
pub struct NoOpCompressor;

impl Compressor for NoOpCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, StateSyncError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, StateSyncError> {
        Ok(data.to_vec())
    }
}
