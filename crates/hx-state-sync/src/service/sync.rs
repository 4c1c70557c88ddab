//! # Sync Protocol Adapter
//!
//! The state machine answering the engine's four snapshot operations:
//! enumerate, offer, serve, apply. Serving stays available while a restore
//! is in progress; the restore session itself is the explicitly owned
//! `RestoreSession` held by the service, never ambient state.

use super::{apply_state_image, StateSyncService};
use crate::domain::capture::decode_state_image;
use crate::domain::chunking::aggregate_hash;
use crate::domain::entities::{SnapshotDescriptor, SNAPSHOT_FORMAT};
use crate::domain::errors::StateSyncError;
use crate::domain::session::{ChunkOutcome, RestorePhase, RestoreSession};
use crate::ports::inbound::{ApplyChunkResult, OfferResult, StateSyncApi};
use crate::ports::outbound::{ChunkStore, Compressor, StateStore};

impl<S, C, Z> StateSyncApi for StateSyncService<S, C, Z>
where
    S: StateStore,
    C: ChunkStore,
    Z: Compressor,
{
    fn list_snapshots(&self) -> Vec<SnapshotDescriptor> {
        self.descriptors_most_recent_first()
    }

    fn offer_snapshot(&mut self, descriptor: SnapshotDescriptor) -> OfferResult {
        if descriptor.format != SNAPSHOT_FORMAT {
            tracing::warn!(
                "[hx-sync] rejecting snapshot offer with unsupported format {}",
                descriptor.format
            );
            return OfferResult::RejectFormat;
        }

        if descriptor.chunk_count == 0
            || descriptor.chunk_hashes.len() != descriptor.chunk_count as usize
        {
            tracing::warn!(
                "[hx-sync] rejecting snapshot offer at height {}: malformed chunk list",
                descriptor.height
            );
            return OfferResult::Reject;
        }

        if descriptor.app_hash == [0u8; 32] {
            tracing::warn!(
                "[hx-sync] rejecting snapshot offer at height {}: no app hash declared",
                descriptor.height
            );
            return OfferResult::Reject;
        }

        // The advertised aggregate hash must match the chunk-hash list it
        // rode in with, or chunk verification could never succeed.
        if aggregate_hash(&descriptor.chunk_hashes) != descriptor.aggregate_hash {
            tracing::warn!(
                "[hx-sync] rejecting snapshot offer at height {}: inconsistent aggregate hash",
                descriptor.height
            );
            return OfferResult::Reject;
        }

        let local_height = match self.committed_height() {
            Ok(height) => height,
            Err(e) => {
                tracing::warn!("[hx-sync] cannot read local height for offer: {}", e);
                return OfferResult::Reject;
            }
        };
        if descriptor.height <= local_height {
            tracing::warn!(
                "[hx-sync] rejecting snapshot offer at height {} behind local height {}",
                descriptor.height,
                local_height
            );
            return OfferResult::Reject;
        }

        if self.session.is_some() {
            tracing::warn!(
                "[hx-sync] rejecting snapshot offer at height {}: restore already active",
                descriptor.height
            );
            return OfferResult::Reject;
        }

        tracing::info!(
            "[hx-sync] accepted snapshot offer: height {}, {} chunks",
            descriptor.height,
            descriptor.chunk_count
        );
        self.session = Some(RestoreSession::new(descriptor));
        OfferResult::Accept
    }

    fn load_snapshot_chunk(
        &self,
        height: u64,
        format: u32,
        index: u32,
    ) -> Result<Vec<u8>, StateSyncError> {
        self.load_chunk(height, format, index)
    }

    fn apply_snapshot_chunk(&mut self, index: u32, payload: &[u8]) -> ApplyChunkResult {
        let Some(session) = self.session.as_mut() else {
            tracing::warn!("[hx-sync] chunk {} applied with no active restore", index);
            return ApplyChunkResult::RejectSnapshot;
        };
        let height = session.descriptor().height;

        match session.record_chunk(index, payload) {
            ChunkOutcome::Duplicate => ApplyChunkResult::Accept,
            ChunkOutcome::Accepted { complete: false } => ApplyChunkResult::Accept,
            ChunkOutcome::Rejected { aborted: false } => {
                tracing::warn!(
                    "[hx-sync] chunk {} of snapshot at height {} failed verification, retrying",
                    index,
                    height
                );
                ApplyChunkResult::Retry
            }
            ChunkOutcome::Rejected { aborted: true } => {
                tracing::error!(
                    "[hx-sync] too many chunk verification failures, abandoning snapshot at height {}",
                    height
                );
                self.end_session(RestorePhase::Aborted);
                ApplyChunkResult::RejectSnapshot
            }
            ChunkOutcome::Accepted { complete: true } => self.finalize_restore(),
        }
    }

    fn abort_restore(&mut self) {
        if self.session.take().is_some() {
            tracing::info!("[hx-sync] restore aborted by sync driver");
        }
        self.last_phase = RestorePhase::Idle;
    }

    fn restore_phase(&self) -> RestorePhase {
        self.session
            .as_ref()
            .map(RestoreSession::phase)
            .unwrap_or(self.last_phase)
    }
}

impl<S, C, Z> StateSyncService<S, C, Z>
where
    S: StateStore,
    C: ChunkStore,
    Z: Compressor,
{
    /// All chunks are in: verify, decode, and apply the assembled state.
    fn finalize_restore(&mut self) -> ApplyChunkResult {
        // The session is consumed either way; only the terminal phase differs.
        let Some(session) = self.session.take() else {
            return ApplyChunkResult::RejectSnapshot;
        };
        let height = session.descriptor().height;

        match self.verify_and_apply(&session) {
            Ok(()) => {
                tracing::info!(
                    "[hx-sync] ✓ state restored from snapshot at height {}, resuming at height {}",
                    height,
                    height + 1
                );
                self.last_phase = RestorePhase::Completed;
                ApplyChunkResult::Accept
            }
            Err(e @ StateSyncError::AppHashMismatch { .. }) => {
                tracing::error!(
                    "[hx-sync] {} - falling back to historical replay sync",
                    e
                );
                self.last_phase = RestorePhase::Aborted;
                ApplyChunkResult::Abort
            }
            Err(StateSyncError::Store(e)) => {
                tracing::error!(
                    "[hx-sync] applying restored state at height {} failed locally: {}",
                    height,
                    e
                );
                self.last_phase = RestorePhase::Aborted;
                ApplyChunkResult::Abort
            }
            Err(e) => {
                tracing::error!(
                    "[hx-sync] snapshot at height {} is unusable: {}",
                    height,
                    e
                );
                self.last_phase = RestorePhase::Aborted;
                ApplyChunkResult::RejectSnapshot
            }
        }
    }

    fn verify_and_apply(&mut self, session: &RestoreSession) -> Result<(), StateSyncError> {
        let descriptor = session.descriptor();

        let assembled = session.assemble()?;
        let encoded = self.compressor.decompress(&assembled)?;
        let image = decode_state_image(&encoded)?;

        if image.metadata.height != descriptor.height {
            return Err(StateSyncError::Serialization(format!(
                "restored image height {} does not match descriptor height {}",
                image.metadata.height, descriptor.height
            )));
        }
        // The image's app hash is what the applied state will report; it must
        // equal the declared target before a single write happens.
        if image.metadata.app_hash != descriptor.app_hash {
            return Err(StateSyncError::AppHashMismatch {
                height: descriptor.height,
                declared: descriptor.app_hash,
                computed: image.metadata.app_hash,
            });
        }

        apply_state_image(&mut self.state_store, &image)
    }
}
