//! # Snapshot Manager
//!
//! Serving-side orchestration: capture → compress → chunk → hash → persist →
//! prune, plus chunk serving for peers.

use super::StateSyncService;
use crate::domain::capture::{build_state_image, encode_state_image};
use crate::domain::chunking::{aggregate_hash, chunk_hash, split_chunks};
use crate::domain::entities::{
    Hash, ImageMetadata, KeyPrefix, SnapshotDescriptor, SnapshotManifest, StateImage,
    SNAPSHOT_FORMAT,
};
use crate::domain::errors::StateSyncError;
use crate::ports::inbound::SnapshotApi;
use crate::ports::outbound::{ChunkStore, Compressor, StateStore};

impl<S, C, Z> StateSyncService<S, C, Z>
where
    S: StateStore,
    C: ChunkStore,
    Z: Compressor,
{
    /// Capture the canonical state image for `height`.
    ///
    /// The capture runs synchronously in the finalize path, directly after
    /// the block's state commit, so requiring the committed-height cursor to
    /// equal `height` pins the view: no later block has mutated anything yet.
    fn capture_image(
        &self,
        height: u64,
        app_hash: Hash,
        block_time: u64,
    ) -> Result<StateImage, StateSyncError> {
        let committed = self.committed_height()?;
        if committed != height {
            return Err(StateSyncError::NotCommitted {
                requested: height,
                committed,
            });
        }

        let state_pairs = self.state_store.prefix_scan(KeyPrefix::STATE)?;
        let nonce_pairs = self.state_store.prefix_scan(KeyPrefix::NONCE)?;
        build_state_image(
            state_pairs,
            nonce_pairs,
            ImageMetadata {
                height,
                app_hash,
                block_time,
            },
        )
    }

    /// Stored snapshot descriptors, most recent first.
    ///
    /// Side-effect free; store failures degrade to an empty list because the
    /// discovery surface has no error channel.
    pub(crate) fn descriptors_most_recent_first(&self) -> Vec<SnapshotDescriptor> {
        let mut manifests = match self.chunk_store.list_manifests() {
            Ok(manifests) => manifests,
            Err(e) => {
                tracing::warn!("[hx-sync] listing snapshots failed: {}", e);
                return Vec::new();
            }
        };
        manifests.sort_unstable_by(|a, b| b.height.cmp(&a.height));
        manifests.iter().map(SnapshotManifest::descriptor).collect()
    }

    /// Load one stored chunk, pinning the snapshot for the read.
    pub(crate) fn load_chunk(
        &self,
        height: u64,
        format: u32,
        index: u32,
    ) -> Result<Vec<u8>, StateSyncError> {
        let manifest = self
            .chunk_store
            .get_manifest(height)?
            .ok_or(StateSyncError::NotFound { height, format })?;
        if manifest.format != format {
            return Err(StateSyncError::NotFound { height, format });
        }
        if index >= manifest.chunk_count() {
            return Err(StateSyncError::ChunkNotFound { height, index });
        }

        let _pin = self.pin_snapshot(height);
        self.chunk_store
            .get_chunk(height, index)?
            .ok_or(StateSyncError::ChunkNotFound { height, index })
    }
}

impl<S, C, Z> SnapshotApi for StateSyncService<S, C, Z>
where
    S: StateStore,
    C: ChunkStore,
    Z: Compressor,
{
    fn create_snapshot(
        &mut self,
        height: u64,
        app_hash: Hash,
        block_time: u64,
    ) -> Result<SnapshotDescriptor, StateSyncError> {
        if self.chunk_store.get_manifest(height)?.is_some() {
            return Err(StateSyncError::AlreadyExists { height });
        }

        tracing::info!("[hx-sync] 📸 creating snapshot at height {}", height);

        let image = self.capture_image(height, app_hash, block_time)?;
        let encoded = encode_state_image(&image)?;
        let compressed = self.compressor.compress(&encoded)?;

        let chunks = split_chunks(&compressed, self.config.chunk_size);
        let chunk_hashes: Vec<Hash> = chunks.iter().map(|c| chunk_hash(c)).collect();
        let manifest = SnapshotManifest {
            height,
            format: SNAPSHOT_FORMAT,
            block_time,
            app_hash,
            aggregate_hash: aggregate_hash(&chunk_hashes),
            chunk_hashes,
        };

        for (index, chunk) in chunks.iter().enumerate() {
            self.chunk_store.put_chunk(height, index as u32, chunk)?;
        }
        // Manifest last: discovery only ever sees fully persisted snapshots.
        self.chunk_store.put_manifest(&manifest)?;

        tracing::info!(
            "[hx-sync] ✓ snapshot at height {} ready: {} chunks, {} bytes compressed",
            height,
            manifest.chunk_count(),
            compressed.len()
        );

        let descriptor = manifest.descriptor();

        // Retention runs after every successful create. A prune failure does
        // not undo the snapshot that was just persisted.
        if let Err(e) = self.prune_old() {
            tracing::warn!("[hx-sync] pruning after snapshot creation failed: {}", e);
        }

        Ok(descriptor)
    }

    fn prune_old(&mut self) -> Result<Vec<u64>, StateSyncError> {
        let mut heights: Vec<u64> = self
            .chunk_store
            .list_manifests()?
            .iter()
            .map(|m| m.height)
            .collect();
        if heights.len() <= self.config.max_snapshots {
            return Ok(Vec::new());
        }

        heights.sort_unstable();
        let excess = heights.len() - self.config.max_snapshots;

        let mut pruned = Vec::new();
        for height in heights.into_iter().take(excess) {
            if self.is_pinned(height) {
                // Left in place; the next prune pass picks it up again.
                tracing::debug!(
                    "[hx-sync] prune of snapshot at height {} deferred: serve in progress",
                    height
                );
                continue;
            }
            self.chunk_store.delete_snapshot(height)?;
            tracing::info!("[hx-sync] pruned old snapshot at height {}", height);
            pruned.push(height);
        }
        Ok(pruned)
    }

    fn on_block_finalized(&mut self, height: u64, app_hash: Hash, block_time: u64) {
        if !self.config.is_snapshot_height(height) {
            return;
        }

        match self.chunk_store.get_manifest(height) {
            Ok(Some(_)) => {
                tracing::debug!(
                    "[hx-sync] snapshot for height {} already exists, skipping",
                    height
                );
                return;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    "[hx-sync] snapshot store check failed at height {}: {}",
                    height,
                    e
                );
                return;
            }
        }

        // Snapshots are auxiliary artifacts: any failure here is logged and
        // swallowed so finalization itself never depends on it.
        if let Err(e) = self.create_snapshot(height, app_hash, block_time) {
            tracing::warn!(
                "[hx-sync] snapshot creation failed at height {}: {} (next attempt at height {})",
                height,
                e,
                height + self.config.snapshot_interval
            );
        }
    }
}
