//! # State Snapshot & Sync Subsystem (hx-sync)
//!
//! Periodic, verifiable snapshots of the full application state and the
//! adapter state machine that answers the consensus engine's snapshot
//! discovery/transfer/apply calls on both the serving and receiving side.
//!
//! ## Architecture
//!
//! ```text
//! finalize pipeline ──on_block_finalized──→ SnapshotManager ──→ ChunkStore
//!                                             │ capture → compress →
//!                                             │ chunk → hash → prune
//! consensus engine ──Enumerate/Offer────────→ SyncProtocolAdapter
//!                  ──Serve(height, index)───→   │ serves peers while
//!                  ──ApplyChunk(index, data)─→  │ restoring itself
//!                                               └──→ StateApplier ──→ StateStore
//! ```
//!
//! ## Domain Invariants
//!
//! | # | Invariant | Description |
//! |---|-----------|-------------|
//! | 1 | Deterministic Capture | Captures of equal state at equal height are byte-identical |
//! | 2 | Chunk Integrity | A chunk enters a session only if its hash matches the manifest |
//! | 3 | Complete Before Apply | Completion requires every index plus a matching aggregate hash |
//! | 4 | Single Session | At most one restore session is active per node |
//! | 5 | Bounded Retention | At most `max_snapshots` retained; oldest pruned first |
//! | 6 | Atomic Restore | Restore writes form one batch; partial state never commits |
//! | 7 | Finalization Isolation | Snapshot creation never fails block finalization |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Pure domain logic (capture, chunking, session state machine)
//! - `ports/` - Port traits (inbound API, outbound SPI)
//! - `adapters/` - In-memory and filesystem adapters, compression codecs
//! - `service/` - Application service implementing the APIs
//!
//! ## Usage
//!
//! ```ignore
//! use hx_state_sync::{SnapshotApi, SnapshotConfig, StateSyncService};
//!
//! let mut service = StateSyncService::new_in_memory(SnapshotConfig::default())?;
//!
//! // Serving side: invoked once per finalized block, errors swallowed.
//! service.on_block_finalized(height, app_hash, block_time);
//!
//! // Receiving side: driven by the consensus engine.
//! let verdict = service.offer_snapshot(descriptor);
//! let result = service.apply_snapshot_chunk(0, &chunk);
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export key types for convenience
pub use adapters::compression::{NoOpCompressor, ZstdCompressor};
pub use adapters::fs_store::FileChunkStore;
pub use adapters::memory::{InMemoryChunkStore, InMemoryStateStore};
pub use config::SnapshotConfig;
pub use domain::entities::{
    Hash, ImageMetadata, KeyPrefix, SnapshotDescriptor, SnapshotManifest, StateImage,
    SNAPSHOT_FORMAT,
};
pub use domain::errors::{StateSyncError, StoreError};
pub use domain::session::{ChunkOutcome, RestorePhase, RestoreSession, MAX_CHUNK_FAILURES};
pub use ports::inbound::{ApplyChunkResult, OfferResult, SnapshotApi, StateSyncApi};
pub use ports::outbound::{BatchOperation, ChunkStore, Compressor, StateStore};
pub use service::{apply_state_image, ServePin, StateSyncService};
