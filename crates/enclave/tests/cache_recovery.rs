//! Losing the state snapshot cache is recoverable: a restarted enclave
//! replays persisted batches to rebuild it.

mod common;

use common::*;
use velum_db::traits::{Database, SnapshotDatabase};
use velum_enclave::service::EnclaveService;
use velum_primitives::params::NodeKind;
use velum_test_utils::TestAccount;

#[test]
fn test_restart_replays_lost_snapshots() {
    let user = TestAccount::generate();
    let bob = TestAccount::generate();
    let genesis = genesis_funding(&[(&user, 1_000_000_000)]);

    let (sequencer, _) = sequencer_setup(Some(genesis.clone()), true);
    let seq_id = sequencer.svc.enclave_id().unwrap();
    feed_l1_root(&[&sequencer]);

    // five batches, one carrying a transfer
    sequencer.svc.create_batch(false).unwrap();
    let vk = ViewingKey::generate();
    let tx = user.signed_transfer(bob.address, 777, 0);
    let blob = encrypt_request(&sequencer.svc, &user, &vk, serde_json::json!({ "tx": tx }));
    sequencer.svc.submit_tx(&blob).unwrap();
    for _ in 0..4 {
        sequencer.svc.create_batch(false).unwrap();
    }
    assert_eq!(sequencer.svc.status().unwrap().l2_head, Some(5));

    // wipe the snapshot cache and restart over the same database
    let db = sequencer.db.clone();
    sequencer.svc.stop().unwrap();
    drop(sequencer);
    db.snapshot_db().purge_all().unwrap();

    let params = mkparams(NodeKind::Sequencer, seq_id, Some(genesis));
    let restarted = EnclaveService::new(params, db, None).expect("restart with empty cache");

    assert_eq!(restarted.status().unwrap().l2_head, Some(5));

    // post-state queries work again: the transfer is visible at latest
    let bob_vk = ViewingKey::generate();
    let blob = encrypt_request(
        &restarted,
        &bob,
        &bob_vk,
        serde_json::json!({ "address": bob.address, "block": "latest" }),
    );
    let response = restarted.get_balance(&blob).unwrap();
    let value = decrypt_response(&bob_vk, &response);
    assert_eq!(value["result"], serde_json::json!(777));
}

#[test]
fn test_restart_without_batches_is_clean() {
    let (sequencer, _) = sequencer_setup(None, true);
    let seq_id = sequencer.svc.enclave_id().unwrap();
    let db = sequencer.db.clone();
    drop(sequencer);

    let params = mkparams(NodeKind::Sequencer, seq_id, None);
    let restarted = EnclaveService::new(params, db, None).expect("fresh restart");
    assert_eq!(restarted.status().unwrap().l2_head, None);
}
