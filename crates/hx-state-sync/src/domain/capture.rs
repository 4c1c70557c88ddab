//! # State Capture
//!
//! Builds the canonical state image from raw storage entries and encodes it
//! into its deterministic byte form. The service layer performs the actual
//! prefix scans; everything here is a pure function of its inputs.

use crate::domain::entities::{ImageMetadata, KeyPrefix, StateImage};
use crate::domain::errors::StateSyncError;
use std::collections::BTreeMap;

/// Assemble a state image from raw `(key, value)` pairs scanned out of the
/// state and nonce namespaces. Namespace prefixes are stripped; nonce values
/// are decoded as u64 little-endian counters.
///
/// Input order is irrelevant: the ordered maps re-sort entries into the
/// canonical lexicographic order.
pub fn build_state_image(
    state_pairs: Vec<(Vec<u8>, Vec<u8>)>,
    nonce_pairs: Vec<(Vec<u8>, Vec<u8>)>,
    metadata: ImageMetadata,
) -> Result<StateImage, StateSyncError> {
    let mut entries = BTreeMap::new();
    for (key, value) in state_pairs {
        let stripped = key
            .strip_prefix(KeyPrefix::STATE)
            .ok_or_else(|| {
                StateSyncError::Serialization(format!(
                    "state scan returned key outside namespace: {key:02x?}"
                ))
            })?
            .to_vec();
        entries.insert(stripped, value);
    }

    let mut nonces = BTreeMap::new();
    for (key, value) in nonce_pairs {
        let stripped = key.strip_prefix(KeyPrefix::NONCE).ok_or_else(|| {
            StateSyncError::Serialization(format!(
                "nonce scan returned key outside namespace: {key:02x?}"
            ))
        })?;
        let sender = String::from_utf8(stripped.to_vec())
            .map_err(|_| StateSyncError::Serialization("nonce sender is not UTF-8".into()))?;
        let counter = decode_u64(&value).ok_or_else(|| {
            StateSyncError::Serialization(format!("nonce counter for {sender} is not 8 bytes"))
        })?;
        nonces.insert(sender, counter);
    }

    Ok(StateImage {
        entries,
        nonces,
        metadata,
    })
}

/// Encode a state image into its canonical byte form.
///
/// Ordered-map iteration under bincode makes two encodings of identical
/// state bit-identical; the resulting bytes feed the chunk hashes that
/// independent nodes must agree on.
pub fn encode_state_image(image: &StateImage) -> Result<Vec<u8>, StateSyncError> {
    bincode::serialize(image).map_err(|e| StateSyncError::Serialization(e.to_string()))
}

/// Decode a state image from its canonical byte form.
pub fn decode_state_image(bytes: &[u8]) -> Result<StateImage, StateSyncError> {
    bincode::deserialize(bytes).map_err(|e| StateSyncError::Serialization(e.to_string()))
}

/// Little-endian u64 encoding used for counters and cursors in the keyspace.
pub fn encode_u64(value: u64) -> [u8; 8] {
    value.to_le_bytes()
}

/// Decode a u64 cursor; `None` unless exactly 8 bytes.
pub fn decode_u64(bytes: &[u8]) -> Option<u64> {
    bytes.try_into().ok().map(u64::from_le_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ImageMetadata {
        ImageMetadata {
            height: 200,
            app_hash: [0xCC; 32],
            block_time: 1_700_000_123,
        }
    }

    fn pairs() -> (Vec<(Vec<u8>, Vec<u8>)>, Vec<(Vec<u8>, Vec<u8>)>) {
        let state = vec![
            (KeyPrefix::state_key(b"currency.balances:bob"), b"25".to_vec()),
            (KeyPrefix::state_key(b"currency.balances:alice"), b"100".to_vec()),
        ];
        let nonces = vec![
            (KeyPrefix::nonce_key("bob"), encode_u64(3).to_vec()),
            (KeyPrefix::nonce_key("alice"), encode_u64(7).to_vec()),
        ];
        (state, nonces)
    }

    #[test]
    fn test_build_strips_prefixes_and_decodes_nonces() {
        let (state, nonces) = pairs();
        let image = build_state_image(state, nonces, metadata()).unwrap();

        assert_eq!(
            image.entries.get(b"currency.balances:alice".as_slice()),
            Some(&b"100".to_vec())
        );
        assert_eq!(image.nonces.get("alice"), Some(&7));
        assert_eq!(image.nonces.get("bob"), Some(&3));
    }

    #[test]
    fn test_encoding_is_input_order_independent() {
        let (state, nonces) = pairs();
        let forward = build_state_image(state.clone(), nonces.clone(), metadata()).unwrap();

        let mut reversed_state = state;
        reversed_state.reverse();
        let mut reversed_nonces = nonces;
        reversed_nonces.reverse();
        let reversed = build_state_image(reversed_state, reversed_nonces, metadata()).unwrap();

        assert_eq!(
            encode_state_image(&forward).unwrap(),
            encode_state_image(&reversed).unwrap()
        );
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let (state, nonces) = pairs();
        let image = build_state_image(state, nonces, metadata()).unwrap();

        let bytes = encode_state_image(&image).unwrap();
        let decoded = decode_state_image(&bytes).unwrap();

        assert_eq!(decoded, image);
    }

    #[test]
    fn test_bad_nonce_counter_is_rejected() {
        let nonces = vec![(KeyPrefix::nonce_key("mallory"), b"not8bytes".to_vec())];
        let result = build_state_image(Vec::new(), nonces, metadata());

        assert!(matches!(result, Err(StateSyncError::Serialization(_))));
    }

    #[test]
    fn test_key_outside_namespace_is_rejected() {
        let state = vec![(b"rogue-key".to_vec(), b"value".to_vec())];
        let result = build_state_image(state, Vec::new(), metadata());

        assert!(matches!(result, Err(StateSyncError::Serialization(_))));
    }
}
