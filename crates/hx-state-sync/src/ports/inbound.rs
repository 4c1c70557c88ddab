//! # Inbound Ports (Driving Ports)
//!
//! The protocol surface the consensus engine drives during state sync, plus
//! the snapshot lifecycle operations the host runtime drives.

use crate::domain::entities::{Hash, SnapshotDescriptor};
use crate::domain::errors::StateSyncError;
use crate::domain::session::RestorePhase;

/// Verdict on an offered snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferResult {
    /// Offer accepted; a restore session is now active.
    Accept,
    /// Offer declined; the engine may offer a different snapshot.
    Reject,
    /// Snapshot format unsupported; the engine should not re-offer it.
    RejectFormat,
}

/// Verdict on one applied chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyChunkResult {
    /// Chunk accepted (or an identical chunk was already present).
    Accept,
    /// Chunk rejected; the engine should refetch and retry it.
    Retry,
    /// This snapshot is unusable; the engine should try another.
    RejectSnapshot,
    /// Fatal; the engine must fall back to historical replay sync.
    Abort,
}

/// The engine-driven snapshot protocol.
///
/// Serving (`list_snapshots`, `load_snapshot_chunk`) is independent of the
/// restore state machine: a node keeps serving peers while restoring itself.
pub trait StateSyncApi {
    /// Enumerate locally served snapshots, most recent first.
    ///
    /// Read-only; storage errors are logged and yield an empty list, since
    /// the protocol surface has no error channel for discovery.
    fn list_snapshots(&self) -> Vec<SnapshotDescriptor>;

    /// Offer a snapshot for restore.
    ///
    /// Accepting creates the single restore session; any invalid offer
    /// (zero chunks, inconsistent hashes, stale height, session already
    /// active) leaves the machine idle.
    fn offer_snapshot(&mut self, descriptor: SnapshotDescriptor) -> OfferResult;

    /// Serve a stored chunk to a syncing peer.
    ///
    /// ## Errors
    ///
    /// - `NotFound`: no snapshot for this height/format
    /// - `ChunkNotFound`: index outside the stored snapshot
    fn load_snapshot_chunk(
        &self,
        height: u64,
        format: u32,
        index: u32,
    ) -> Result<Vec<u8>, StateSyncError>;

    /// Ingest one chunk of the active restore.
    ///
    /// Chunks may arrive in any order; once every index is present the
    /// assembled state is verified and applied in one atomic batch.
    fn apply_snapshot_chunk(&mut self, index: u32, payload: &[u8]) -> ApplyChunkResult;

    /// Discard the active session and return to idle. Driven externally,
    /// e.g. when the sync driver exhausts its peers.
    fn abort_restore(&mut self);

    /// Current phase of the restore state machine.
    fn restore_phase(&self) -> RestorePhase;
}

/// Snapshot lifecycle operations for the host runtime.
pub trait SnapshotApi {
    /// Capture, chunk, hash, and persist a snapshot of the committed state
    /// at `height`, then prune beyond the retention limit.
    ///
    /// ## Errors
    ///
    /// - `AlreadyExists`: a snapshot for `height` is already stored
    /// - `NotCommitted`: `height` is not the committed height
    /// - `Store`: manifest/chunk persistence failed
    fn create_snapshot(
        &mut self,
        height: u64,
        app_hash: Hash,
        block_time: u64,
    ) -> Result<SnapshotDescriptor, StateSyncError>;

    /// Delete snapshots beyond `max_snapshots`, oldest first. Snapshots with
    /// an outstanding serve pin are deferred to the next pass. Returns the
    /// pruned heights.
    fn prune_old(&mut self) -> Result<Vec<u64>, StateSyncError>;

    /// Invoked once per finalized block. Creates a snapshot when the height
    /// policy says so; every error is logged and swallowed, so finalization
    /// never depends on snapshot creation.
    fn on_block_finalized(&mut self, height: u64, app_hash: Hash, block_time: u64);
}
