//! # State Sync Service
//!
//! The application service implementing the snapshot and sync APIs.
//!
//! ## Architecture
//!
//! This service:
//! 1. Implements `SnapshotApi` for the host's finalize pipeline (serving side)
//! 2. Implements `StateSyncApi` for the consensus engine (both sides)
//! 3. Owns the single restore session and the serve pin counts
//! 4. Uses dependency injection for storage and compression
//!
//! Mutating operations take `&mut self` (single-owner serialization: one
//! `create_snapshot`, one restore session, single-writer chunk ingest);
//! serving reads take `&self` and stay safely concurrent. Pin counts live
//! behind a mutex so shared-reference readers can register in-flight serves
//! that pruning must not race.

mod applier;
mod manager;
mod sync;

pub use applier::apply_state_image;

use crate::adapters::compression::ZstdCompressor;
use crate::adapters::memory::{InMemoryChunkStore, InMemoryStateStore};
use crate::config::SnapshotConfig;
use crate::domain::capture::decode_u64;
use crate::domain::entities::KeyPrefix;
use crate::domain::errors::StateSyncError;
use crate::domain::session::{RestorePhase, RestoreSession};
use crate::ports::outbound::{ChunkStore, Compressor, StateStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// The state snapshot & sync service.
///
/// Generic over the storage-engine boundary (`S`), the snapshot artifact
/// store (`C`), and the compression codec (`Z`).
pub struct StateSyncService<S, C, Z>
where
    S: StateStore,
    C: ChunkStore,
    Z: Compressor,
{
    config: SnapshotConfig,
    state_store: S,
    chunk_store: C,
    compressor: Z,
    /// The single restore session, when one is active.
    session: Option<RestoreSession>,
    /// Phase reported while no session is active (Idle, or the terminal
    /// phase of the previous session).
    last_phase: RestorePhase,
    /// Heights with serve reads in flight; pruning defers these. Shared with
    /// the `ServePin` guards handed out to the serving layer.
    serve_pins: Arc<Mutex<HashMap<u64, u32>>>,
}

impl<S, C, Z> StateSyncService<S, C, Z>
where
    S: StateStore,
    C: ChunkStore,
    Z: Compressor,
{
    /// Create a service over the given adapters. Fails on invalid config.
    pub fn new(
        config: SnapshotConfig,
        state_store: S,
        chunk_store: C,
        compressor: Z,
    ) -> Result<Self, StateSyncError> {
        config.validate()?;
        Ok(Self {
            config,
            state_store,
            chunk_store,
            compressor,
            session: None,
            last_phase: RestorePhase::Idle,
            serve_pins: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn state_store(&self) -> &S {
        &self.state_store
    }

    pub fn state_store_mut(&mut self) -> &mut S {
        &mut self.state_store
    }

    /// The committed-height cursor (0 before any block commits).
    pub fn committed_height(&self) -> Result<u64, StateSyncError> {
        match self.state_store.get(KeyPrefix::META_HEIGHT)? {
            Some(bytes) => decode_u64(&bytes).ok_or_else(|| {
                StateSyncError::Serialization("height cursor is not 8 bytes".into())
            }),
            None => Ok(0),
        }
    }

    /// Pin a snapshot against pruning for the guard's lifetime. The network
    /// layer holds one of these across a streamed chunk transfer.
    pub fn pin_snapshot(&self, height: u64) -> ServePin {
        let mut pins = lock_pins(&self.serve_pins);
        *pins.entry(height).or_insert(0) += 1;
        ServePin {
            pins: Arc::clone(&self.serve_pins),
            height,
        }
    }

    pub(crate) fn is_pinned(&self, height: u64) -> bool {
        lock_pins(&self.serve_pins).contains_key(&height)
    }

    pub(crate) fn end_session(&mut self, phase: RestorePhase) {
        self.session = None;
        self.last_phase = phase;
    }
}

impl StateSyncService<InMemoryStateStore, InMemoryChunkStore, ZstdCompressor> {
    /// Create a service with in-memory adapters and the default codec.
    pub fn new_in_memory(config: SnapshotConfig) -> Result<Self, StateSyncError> {
        Self::new(
            config,
            InMemoryStateStore::new(),
            InMemoryChunkStore::new(),
            ZstdCompressor::default(),
        )
    }
}

/// RAII guard keeping one snapshot alive while a serve read is in flight.
pub struct ServePin {
    pins: Arc<Mutex<HashMap<u64, u32>>>,
    height: u64,
}

impl Drop for ServePin {
    fn drop(&mut self) {
        let mut pins = lock_pins(&self.pins);
        if let Some(count) = pins.get_mut(&self.height) {
            *count -= 1;
            if *count == 0 {
                pins.remove(&self.height);
            }
        }
    }
}

/// A poisoned pin mutex only means a panic mid-serve; the counts themselves
/// stay coherent, so recover the guard rather than propagate.
fn lock_pins(pins: &Mutex<HashMap<u64, u32>>) -> MutexGuard<'_, HashMap<u64, u32>> {
    pins.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
