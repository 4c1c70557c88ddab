//! # Restore Session
//!
//! Receiving-side state machine for one snapshot download/verify/apply
//! cycle. Chunks arrive in any order, possibly from several concurrent
//! transfers; correctness depends only on which indices are present, never
//! on arrival order.

use crate::domain::chunking::{aggregate_hash, chunk_hash};
use crate::domain::entities::SnapshotDescriptor;
use crate::domain::errors::StateSyncError;

/// Consecutive chunk verification failures tolerated before the session
/// gives up on the snapshot.
pub const MAX_CHUNK_FAILURES: u32 = 5;

/// Phase of the restore state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    /// No session active.
    Idle,
    /// Offer accepted; no chunk received yet.
    Offered,
    /// At least one chunk received.
    Restoring,
    /// Every chunk verified and the state image applied.
    Completed,
    /// Session ended without applying state.
    Aborted,
}

/// Outcome of feeding one chunk into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Chunk verified and recorded.
    Accepted {
        /// All indices are now present.
        complete: bool,
    },
    /// Identical chunk already recorded; nothing to do.
    Duplicate,
    /// Hash mismatch or out-of-range index. Retryable unless `aborted`.
    Rejected {
        /// The consecutive-failure bound was hit; the session is dead.
        aborted: bool,
    },
}

/// Tracking for an in-progress restore: the accepted descriptor, which
/// indices have arrived, and the per-index assembly buffer.
pub struct RestoreSession {
    descriptor: SnapshotDescriptor,
    buffers: Vec<Option<Vec<u8>>>,
    received_count: u32,
    consecutive_failures: u32,
    phase: RestorePhase,
}

impl RestoreSession {
    /// Open a session for an accepted offer.
    pub fn new(descriptor: SnapshotDescriptor) -> Self {
        let count = descriptor.chunk_count as usize;
        Self {
            descriptor,
            buffers: vec![None; count],
            received_count: 0,
            consecutive_failures: 0,
            phase: RestorePhase::Offered,
        }
    }

    pub fn descriptor(&self) -> &SnapshotDescriptor {
        &self.descriptor
    }

    pub fn phase(&self) -> RestorePhase {
        self.phase
    }

    pub fn received_count(&self) -> u32 {
        self.received_count
    }

    /// All indices `0..chunk_count` are present.
    pub fn is_complete(&self) -> bool {
        self.received_count == self.descriptor.chunk_count
    }

    /// Feed one chunk into the session.
    ///
    /// The payload hash is checked against the manifest entry for `index`
    /// before anything is stored, so corrupted data never reaches the
    /// assembly buffer. A verified duplicate is a no-op; a re-delivery with
    /// different bytes at the same index is a mismatch.
    pub fn record_chunk(&mut self, index: u32, payload: &[u8]) -> ChunkOutcome {
        let expected = match self.descriptor.chunk_hashes.get(index as usize) {
            Some(hash) => *hash,
            None => return self.reject(),
        };
        if chunk_hash(payload) != expected {
            return self.reject();
        }

        let slot = &mut self.buffers[index as usize];
        if slot.is_some() {
            return ChunkOutcome::Duplicate;
        }

        *slot = Some(payload.to_vec());
        self.received_count += 1;
        self.consecutive_failures = 0;
        self.phase = RestorePhase::Restoring;

        ChunkOutcome::Accepted {
            complete: self.is_complete(),
        }
    }

    fn reject(&mut self) -> ChunkOutcome {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= MAX_CHUNK_FAILURES {
            self.phase = RestorePhase::Aborted;
            return ChunkOutcome::Rejected { aborted: true };
        }
        ChunkOutcome::Rejected { aborted: false }
    }

    /// Reassemble the compressed snapshot payload, verifying the aggregate
    /// hash over the received chunk hashes against the manifest first.
    pub fn assemble(&self) -> Result<Vec<u8>, StateSyncError> {
        let mut hashes = Vec::with_capacity(self.buffers.len());
        let mut assembled = Vec::new();
        for (index, slot) in self.buffers.iter().enumerate() {
            let payload = slot.as_ref().ok_or(StateSyncError::ChunkNotFound {
                height: self.descriptor.height,
                index: index as u32,
            })?;
            hashes.push(chunk_hash(payload));
            assembled.extend_from_slice(payload);
        }

        if aggregate_hash(&hashes) != self.descriptor.aggregate_hash {
            return Err(StateSyncError::AggregateHashMismatch {
                height: self.descriptor.height,
            });
        }

        Ok(assembled)
    }
}
