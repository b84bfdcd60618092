//! Fresh sequencer plus fresh validator: secret exchange over the L1,
//! genesis batch minted, shipped, and re-executed.

mod common;

use common::*;
use velum_enclave::{l1::secrets::secret_request_topic, service::StatusCode};
use velum_state::prelude::*;
use velum_test_utils::l1_block_with_receipts;

#[test]
fn test_genesis_path() {
    let (sequencer, _seq_sk) = sequencer_setup(None, false);
    let seq_id = sequencer.svc.enclave_id().unwrap();
    let validator = validator_setup(seq_id, None, false);

    // both enclaves await the network secret
    assert_eq!(
        sequencer.svc.status().unwrap().code,
        StatusCode::AwaitingSecret
    );

    // genesis enclave mints the secret
    sequencer.svc.generate_secret().unwrap();
    assert_eq!(sequencer.svc.status().unwrap().code, StatusCode::Running);

    // validator asks for it through the L1 secret-request flow
    let root = feed_l1_root(&[&sequencer, &validator]);
    let report = validator.svc.attestation().unwrap();
    let request_block = l1_block_with_receipts(
        root.header(),
        vec![Receipt {
            tx: TxId::zero(),
            success: true,
            gas_used: 0,
            contract_address: None,
            logs: vec![Log {
                address: management_address(),
                topics: vec![secret_request_topic()],
                data: borsh::to_vec(&report).unwrap(),
            }],
        }],
    );

    let response = sequencer.svc.submit_l1_block(request_block.clone()).unwrap();
    assert_eq!(response.produced_secret_responses.len(), 1);
    let secret_response = &response.produced_secret_responses[0];
    assert_eq!(secret_response.requester_id, validator.svc.enclave_id().unwrap());

    validator.svc.submit_l1_block(request_block).unwrap();
    validator
        .svc
        .init_enclave(&secret_response.envelope)
        .unwrap();
    assert_eq!(validator.svc.status().unwrap().code, StatusCode::Running);

    // streams attach before any batch exists
    let seq_stream = sequencer.svc.stream_l2_updates();
    let val_stream = validator.svc.stream_l2_updates();

    // empty chain: the genesis batch is minted even when skipping empties
    sequencer.svc.create_batch(false).unwrap();

    let update = seq_stream.try_recv().expect("sequencer streamed batch");
    assert_eq!(update.batch.seq_no(), GENESIS_SEQ);
    assert!(update.logs.is_empty());

    // ship it to the validator
    let ext = sequencer.svc.get_batch_by_seq_no(GENESIS_SEQ).unwrap();
    validator.svc.submit_batch(&ext).unwrap();

    let update = val_stream.try_recv().expect("validator streamed batch");
    assert_eq!(update.batch.seq_no(), GENESIS_SEQ);
    assert!(update.logs.is_empty());

    assert_eq!(sequencer.svc.status().unwrap().l2_head, Some(GENESIS_SEQ));
    assert_eq!(validator.svc.status().unwrap().l2_head, Some(GENESIS_SEQ));

    // both opened the same batch: equal ext forms all the way down
    let val_ext = validator.svc.get_batch_by_seq_no(GENESIS_SEQ).unwrap();
    assert_eq!(ext, val_ext);
}

#[test]
fn test_stop_gates_every_entry_point() {
    let (sequencer, _) = sequencer_setup(None, true);
    sequencer.svc.stop().unwrap();
    // idempotent
    sequencer.svc.stop().unwrap();

    assert!(sequencer
        .svc
        .create_batch(false)
        .unwrap_err()
        .is_unavailable());
    assert!(sequencer
        .svc
        .generate_secret()
        .unwrap_err()
        .is_unavailable());
    assert_eq!(
        sequencer.svc.status().unwrap().code,
        StatusCode::Unavailable
    );
}
