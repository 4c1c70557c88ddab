//! # Integration Tests Crate
//!
//! Cross-component tests driving the snapshot subsystem the way the real
//! deployment does: a finalize pipeline committing blocks on the serving
//! side, and a sync driver shuttling descriptors and chunks to a restoring
//! node on the receiving side.
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! └── src/
//!     ├── lib.rs       # This file: TestNode harness + sync driver
//!     └── sync_flow.rs # End-to-end state sync scenarios
//! ```

use hx_state_sync::{
    ApplyChunkResult, InMemoryChunkStore, InMemoryStateStore, KeyPrefix, OfferResult,
    SnapshotApi, SnapshotConfig, SnapshotDescriptor, StateStore, StateSyncApi, StateSyncService,
    ZstdCompressor,
};
use std::sync::Once;

#[cfg(test)]
mod sync_flow;

static INIT: Once = Once::new();

/// Initialize tracing once for the whole test binary (RUST_LOG-driven).
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// One simulated node: the snapshot service over in-memory adapters plus the
/// block-commit plumbing the host runtime would provide around it.
pub struct TestNode {
    pub service: StateSyncService<InMemoryStateStore, InMemoryChunkStore, ZstdCompressor>,
    pub height: u64,
}

impl TestNode {
    pub fn new(config: SnapshotConfig) -> Self {
        Self {
            service: StateSyncService::new_in_memory(config).expect("valid test config"),
            height: 0,
        }
    }

    /// Deterministic per-height app hash stand-in. Real nodes derive this
    /// from execution results; for the harness it only has to be stable
    /// across nodes with identical state.
    pub fn app_hash(height: u64) -> [u8; 32] {
        let mut hash = [0x5A; 32];
        hash[..8].copy_from_slice(&height.to_le_bytes());
        hash
    }

    /// Write one application state entry.
    pub fn set_state(&mut self, key: &str, value: &str) {
        self.service
            .state_store_mut()
            .put(&KeyPrefix::state_key(key.as_bytes()), value.as_bytes())
            .expect("in-memory put");
    }

    /// Write one sender nonce counter.
    pub fn set_nonce(&mut self, sender: &str, counter: u64) {
        self.service
            .state_store_mut()
            .put(&KeyPrefix::nonce_key(sender), &counter.to_le_bytes())
            .expect("in-memory put");
    }

    /// Commit a block and run the finalize hook, exactly once per height.
    pub fn finalize_block(&mut self, height: u64) {
        let app_hash = Self::app_hash(height);
        self.service
            .state_store_mut()
            .commit_block(height, app_hash, 1_700_000_000 + height);
        self.service
            .on_block_finalized(height, app_hash, 1_700_000_000 + height);
        self.height = height;
    }

    /// The state namespace content, for cross-node comparison.
    pub fn state_entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.service
            .state_store()
            .prefix_scan(KeyPrefix::STATE)
            .expect("in-memory scan")
    }
}

/// Minimal stand-in for the external sync driver: pick the server's most
/// recent snapshot, offer it, then pump chunks in the given order until the
/// session finishes one way or the other.
pub fn run_sync_driver(
    server: &TestNode,
    client: &mut TestNode,
    delivery_order: &[u32],
) -> (OfferResult, Option<ApplyChunkResult>) {
    let Some(descriptor) = server.service.list_snapshots().into_iter().next() else {
        return (OfferResult::Reject, None);
    };
    run_sync_driver_with(server, client, descriptor, delivery_order)
}

/// Same as [`run_sync_driver`], with a caller-supplied descriptor (for
/// tampering scenarios).
pub fn run_sync_driver_with(
    server: &TestNode,
    client: &mut TestNode,
    descriptor: SnapshotDescriptor,
    delivery_order: &[u32],
) -> (OfferResult, Option<ApplyChunkResult>) {
    let offer = client.service.offer_snapshot(descriptor.clone());
    if offer != OfferResult::Accept {
        return (offer, None);
    }

    let mut last = None;
    for &index in delivery_order {
        let chunk = server
            .service
            .load_snapshot_chunk(descriptor.height, descriptor.format, index)
            .expect("server must hold every advertised chunk");
        let verdict = client.service.apply_snapshot_chunk(index, &chunk);
        last = Some(verdict);
        match verdict {
            ApplyChunkResult::Accept | ApplyChunkResult::Retry => {}
            // Terminal verdicts end the transfer, as the engine would.
            ApplyChunkResult::RejectSnapshot | ApplyChunkResult::Abort => break,
        }
    }
    tracing::debug!(
        "[harness] transfer for height {} ended with {:?}",
        descriptor.height,
        last
    );
    (offer, last)
}
