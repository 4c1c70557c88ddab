//! # Snapshot Configuration

use crate::domain::errors::StateSyncError;
use serde::{Deserialize, Serialize};

/// Configuration for the snapshot & sync subsystem.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Create a snapshot every this many blocks.
    pub snapshot_interval: u64,

    /// Number of snapshots retained; older ones are pruned, oldest first.
    pub max_snapshots: usize,

    /// Chunk payload size in bytes (the final chunk may be shorter).
    pub chunk_size: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: 200,
            max_snapshots: 5,
            chunk_size: 10 * 1024 * 1024, // 10 MiB chunks
        }
    }
}

impl SnapshotConfig {
    /// Validate at startup. Services refuse to construct on bad values.
    pub fn validate(&self) -> Result<(), StateSyncError> {
        if self.snapshot_interval == 0 {
            return Err(StateSyncError::InvalidConfig(
                "snapshot_interval must be positive".into(),
            ));
        }
        if self.max_snapshots == 0 {
            return Err(StateSyncError::InvalidConfig(
                "max_snapshots must be at least 1".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(StateSyncError::InvalidConfig(
                "chunk_size must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Whether a snapshot should be taken at this height.
    ///
    /// Genesis (height 0) is never snapshotted.
    pub fn is_snapshot_height(&self, height: u64) -> bool {
        height > 0 && height % self.snapshot_interval == 0
    }

    /// Create a config for testing (small values, multi-chunk snapshots).
    pub fn for_testing() -> Self {
        Self {
            snapshot_interval: 10,
            max_snapshots: 2,
            chunk_size: 64,
        }
    }
}
