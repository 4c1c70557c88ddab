//! # State Applier
//!
//! Writes a restored state image directly into storage, bypassing
//! transaction execution. The result is byte-identical to replaying every
//! historical transaction up to the snapshot height.

use crate::domain::capture::encode_u64;
use crate::domain::entities::{KeyPrefix, StateImage};
use crate::domain::errors::StateSyncError;
use crate::ports::outbound::{BatchOperation, StateStore};

/// Apply a decoded state image as one atomic batch.
///
/// Every state entry, every nonce counter, and the height/app-hash/block-time
/// cursors land together or not at all: a half-applied state would have an
/// undefined app hash. On success the committed-height cursor equals the
/// snapshot height, so block processing resumes at height + 1.
pub fn apply_state_image<S: StateStore>(
    store: &mut S,
    image: &StateImage,
) -> Result<(), StateSyncError> {
    let mut operations = Vec::with_capacity(image.entries.len() + image.nonces.len() + 3);

    for (key, value) in &image.entries {
        operations.push(BatchOperation::put(KeyPrefix::state_key(key), value.clone()));
    }
    for (sender, counter) in &image.nonces {
        operations.push(BatchOperation::put(
            KeyPrefix::nonce_key(sender),
            encode_u64(*counter).to_vec(),
        ));
    }
    operations.push(BatchOperation::put(
        KeyPrefix::META_HEIGHT.to_vec(),
        encode_u64(image.metadata.height).to_vec(),
    ));
    operations.push(BatchOperation::put(
        KeyPrefix::META_APP_HASH.to_vec(),
        image.metadata.app_hash.to_vec(),
    ));
    operations.push(BatchOperation::put(
        KeyPrefix::META_BLOCK_TIME.to_vec(),
        encode_u64(image.metadata.block_time).to_vec(),
    ));

    store.atomic_batch_write(operations)?;
    Ok(())
}
