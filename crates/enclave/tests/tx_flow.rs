//! A user transaction travels the whole pipeline under viewing-key
//! encryption: submit, sequence, execute, query the receipt.

mod common;

use common::*;
use velum_primitives::buf::Buf20;
use velum_state::prelude::*;
use velum_test_utils::TestAccount;

#[test]
fn test_tx_flow_with_viewing_keys() {
    let user = TestAccount::generate();
    let genesis = genesis_funding(&[(&user, 1_000_000_000)]);

    let (sequencer, _) = sequencer_setup(Some(genesis), true);
    feed_l1_root(&[&sequencer]);

    // chain bootstrap
    sequencer.svc.create_batch(false).unwrap();

    // user ships a transfer under their viewing key
    let vk = ViewingKey::generate();
    let tx = user.signed_transfer(Buf20::from([7; 20]), 12_345, 0);
    let tx_id = tx.id();

    let blob = encrypt_request(
        &sequencer.svc,
        &user,
        &vk,
        serde_json::json!({ "tx": tx }),
    );
    let response = sequencer.svc.submit_tx(&blob).unwrap();
    let value = decrypt_response(&vk, &response);
    assert!(value.get("result").is_some(), "submit failed: {value}");

    // the next batch carries it
    sequencer.svc.create_batch(true).unwrap();
    assert_eq!(sequencer.svc.status().unwrap().l2_head, Some(2));

    let ext = sequencer.svc.get_batch_by_seq_no(2).unwrap();
    let opened = test_codec().to_batch(&ext).unwrap();
    assert_eq!(opened.transactions().len(), 1);
    assert_eq!(opened.transactions()[0].id(), tx_id);

    // the owner reads their receipt
    let blob = encrypt_request(
        &sequencer.svc,
        &user,
        &vk,
        serde_json::json!({ "hash": tx_id }),
    );
    let response = sequencer.svc.get_transaction_receipt(&blob).unwrap();
    let value = decrypt_response(&vk, &response);
    let receipt = value.get("result").expect("receipt present");
    assert_eq!(receipt["status"], 1);

    // a stranger's viewing key is refused
    let stranger = TestAccount::generate();
    let stranger_vk = ViewingKey::generate();
    let blob = encrypt_request(
        &sequencer.svc,
        &stranger,
        &stranger_vk,
        serde_json::json!({ "hash": tx_id }),
    );
    let response = sequencer.svc.get_transaction_receipt(&blob).unwrap();
    let value = decrypt_response(&stranger_vk, &response);
    assert!(value.get("error").is_some());
    assert!(value["error"]
        .as_str()
        .unwrap()
        .contains("not authorized"));

    // balances reflect the transfer
    let blob = encrypt_request(
        &sequencer.svc,
        &user,
        &vk,
        serde_json::json!({ "address": user.address, "block": "latest" }),
    );
    let response = sequencer.svc.get_balance(&blob).unwrap();
    let value = decrypt_response(&vk, &response);
    let fee = (21_000 * tx.gas_price) as u128;
    let expected = 1_000_000_000u128 - 12_345 - fee;
    assert_eq!(value["result"], serde_json::json!(expected));
}

#[test]
fn test_mismatched_viewing_key_binding_refused() {
    let user = TestAccount::generate();
    let mallory = TestAccount::generate();
    let genesis = genesis_funding(&[(&user, 1_000_000)]);

    let (sequencer, _) = sequencer_setup(Some(genesis), true);
    feed_l1_root(&[&sequencer]);

    // mallory signs the viewing key but claims user's address
    let vk = ViewingKey::generate();
    let blob = encrypt_request(
        &sequencer.svc,
        &mallory,
        &vk,
        serde_json::json!({ "address": user.address, "block": "latest" }),
    );
    let response = sequencer.svc.get_balance(&blob).unwrap();
    let value = decrypt_response(&vk, &response);
    assert!(value["error"]
        .as_str()
        .unwrap()
        .contains("viewing key"));
}
