//! # State Sync Flow Scenarios
//!
//! Full serving-node → syncing-node flows through the public protocol
//! surface only, the way the consensus engine and sync driver exercise it.

use crate::{init_tracing, run_sync_driver, run_sync_driver_with, TestNode};
use hx_state_sync::{
    ApplyChunkResult, OfferResult, RestorePhase, SnapshotConfig, StateSyncApi, StateSyncError,
    SNAPSHOT_FORMAT,
};
use rand::seq::SliceRandom;
use rand::Rng;

fn config(interval: u64, max_snapshots: usize, chunk_size: usize) -> SnapshotConfig {
    SnapshotConfig {
        snapshot_interval: interval,
        max_snapshots,
        chunk_size,
    }
}

/// A node with a few hundred pseudo-random ledger entries, finalized through
/// the given heights so the hook creates its snapshots organically.
fn populated_node(cfg: SnapshotConfig, seed_entries: usize, heights: &[u64]) -> TestNode {
    let mut node = TestNode::new(cfg);
    let mut rng = rand::thread_rng();
    for i in 0..seed_entries {
        let account = format!("currency.balances:wallet{i:04}");
        node.set_state(&account, &format!("{}", rng.gen_range(1..1_000_000u64)));
    }
    for i in 0..seed_entries / 10 {
        node.set_nonce(&format!("wallet{i:04}"), rng.gen_range(0..500));
    }
    for &height in heights {
        node.finalize_block(height);
    }
    node
}

#[test]
fn test_full_state_sync_between_nodes() {
    init_tracing();
    let mut server = populated_node(config(100, 5, 512), 300, &[100]);
    let descriptor = server.service.list_snapshots().remove(0);
    assert!(descriptor.chunk_count > 1, "state must span several chunks");

    let mut client = TestNode::new(config(100, 5, 512));
    let mut order: Vec<u32> = (0..descriptor.chunk_count).collect();
    order.shuffle(&mut rand::thread_rng());

    let (offer, last) = run_sync_driver(&server, &mut client, &order);
    assert_eq!(offer, OfferResult::Accept);
    assert_eq!(last, Some(ApplyChunkResult::Accept));
    assert_eq!(client.service.restore_phase(), RestorePhase::Completed);

    // The restored node holds storage content identical to the server's and
    // resumes block processing right after the snapshot height.
    assert_eq!(client.state_entries(), server.state_entries());
    assert_eq!(client.service.committed_height().unwrap(), 100);

    server.finalize_block(101);
    assert_eq!(server.height, 101);
}

#[test]
fn test_independent_nodes_produce_identical_snapshots() {
    init_tracing();
    // Two nodes built separately over the same ledger content must advertise
    // byte-identical snapshots, or content hashes could never agree.
    let build = || {
        let mut node = TestNode::new(config(50, 3, 256));
        for i in 0..120 {
            node.set_state(
                &format!("currency.balances:wallet{i:04}"),
                &format!("{}", i * 13),
            );
            node.set_nonce(&format!("wallet{i:04}"), i as u64);
        }
        node.finalize_block(50);
        node
    };
    let node_a = build();
    let node_b = build();

    let desc_a = node_a.service.list_snapshots().remove(0);
    let desc_b = node_b.service.list_snapshots().remove(0);
    assert_eq!(desc_a, desc_b);

    for index in 0..desc_a.chunk_count {
        let chunk_a = node_a
            .service
            .load_snapshot_chunk(50, SNAPSHOT_FORMAT, index)
            .unwrap();
        let chunk_b = node_b
            .service
            .load_snapshot_chunk(50, SNAPSHOT_FORMAT, index)
            .unwrap();
        assert_eq!(chunk_a, chunk_b, "chunk {index} differs between nodes");
    }
}

#[test]
fn test_retention_scenario_prunes_oldest() {
    init_tracing();
    // interval=1000, max_snapshots=2; snapshots at 1000, 2000, 3000.
    let mut node = populated_node(config(1000, 2, 1024), 100, &[1000, 2000, 3000]);

    let heights: Vec<u64> = node
        .service
        .list_snapshots()
        .iter()
        .map(|d| d.height)
        .collect();
    assert_eq!(heights, vec![3000, 2000]);

    assert!(matches!(
        node.service.load_snapshot_chunk(1000, SNAPSHOT_FORMAT, 0),
        Err(StateSyncError::NotFound { height: 1000, .. })
    ));
}

#[test]
fn test_tampered_descriptor_forces_replay_fallback() {
    init_tracing();
    let server = populated_node(config(100, 5, 512), 200, &[100]);
    let mut descriptor = server.service.list_snapshots().remove(0);
    descriptor.app_hash = [0xDE; 32];

    let mut client = TestNode::new(config(100, 5, 512));
    let order: Vec<u32> = (0..descriptor.chunk_count).collect();
    let (offer, last) = run_sync_driver_with(&server, &mut client, descriptor, &order);

    assert_eq!(offer, OfferResult::Accept);
    assert_eq!(last, Some(ApplyChunkResult::Abort));
    assert_eq!(client.service.restore_phase(), RestorePhase::Aborted);
    assert!(client.state_entries().is_empty(), "no partial state applied");
    assert_eq!(client.service.committed_height().unwrap(), 0);
}

#[test]
fn test_driver_abort_then_successful_resync() {
    init_tracing();
    let server = populated_node(config(100, 5, 512), 200, &[100]);
    let descriptor = server.service.list_snapshots().remove(0);

    let mut client = TestNode::new(config(100, 5, 512));
    assert_eq!(
        client.service.offer_snapshot(descriptor.clone()),
        OfferResult::Accept
    );
    let chunk = server
        .service
        .load_snapshot_chunk(100, SNAPSHOT_FORMAT, 0)
        .unwrap();
    client.service.apply_snapshot_chunk(0, &chunk);

    // Discovery exhausted: the driver gives up, then finds a new peer.
    client.service.abort_restore();
    assert_eq!(client.service.restore_phase(), RestorePhase::Idle);

    let order: Vec<u32> = (0..descriptor.chunk_count).collect();
    let (offer, last) = run_sync_driver(&server, &mut client, &order);
    assert_eq!(offer, OfferResult::Accept);
    assert_eq!(last, Some(ApplyChunkResult::Accept));
    assert_eq!(client.state_entries(), server.state_entries());
}

#[test]
fn test_hook_driven_snapshots_only_on_interval() {
    init_tracing();
    let mut node = TestNode::new(config(10, 5, 256));
    node.set_state("currency.balances:solo", "1");

    for height in 1..=25 {
        node.finalize_block(height);
    }

    let heights: Vec<u64> = node
        .service
        .list_snapshots()
        .iter()
        .map(|d| d.height)
        .collect();
    assert_eq!(heights, vec![20, 10]);
}
