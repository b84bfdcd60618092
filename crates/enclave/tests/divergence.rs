//! A validator never advances its head past a batch whose replayed roots
//! disagree with the sequencer's signed ones.

mod common;

use common::*;
use velum_crypto::{keys::EnclaveKey, sig};
use velum_enclave::errors::SystemErrorKind;
use velum_primitives::buf::Buf32;
use velum_state::prelude::*;

#[test]
fn test_divergent_batch_refused() {
    let (sequencer, seq_sk) = sequencer_setup(None, true);
    let seq_id = sequencer.svc.enclave_id().unwrap();
    let validator = validator_setup(seq_id, None, true);

    feed_l1_root(&[&sequencer, &validator]);

    // honest genesis batch flows through
    sequencer.svc.create_batch(false).unwrap();
    let ext1 = sequencer.svc.get_batch_by_seq_no(GENESIS_SEQ).unwrap();
    validator.svc.submit_batch(&ext1).unwrap();
    assert_eq!(validator.svc.status().unwrap().l2_head, Some(GENESIS_SEQ));

    let val_stream = validator.svc.stream_l2_updates();

    // a correctly-signed batch 2 whose state root is a lie
    let seq_key = EnclaveKey::from_secret_bytes(&Buf32::from(seq_sk.secret_bytes())).unwrap();
    let codec = test_codec();
    let l1_proof = ext1.header.header().l1_proof;
    let body = BatchBody::default();
    let header = BatchHeader {
        seq_no: 2,
        height: 2,
        parent: ext1.id(),
        l1_proof,
        timestamp: ext1.header.header().timestamp + 1,
        state_root: Buf32::from([0xde; 32]),
        txs_root: body.txs_root(),
        receipts_root: receipts_root(&[]),
        logs_bloom: LogsBloom::zero(),
        gas_used: 0,
    };
    let (signature, rec) = sig::sign_recoverable(&header.sighash(), seq_key.secret_key());
    let forged = Batch::new(SignedBatchHeader::new(header, signature, rec), body);
    let forged_ext = codec.to_ext_batch(&forged).unwrap();

    let err = validator.svc.submit_batch(&forged_ext).unwrap_err();
    assert_eq!(err.kind, SystemErrorKind::Internal);
    assert!(err.message.contains("divergence"));

    // the head did not move: nothing new streamed
    assert!(val_stream.try_recv().is_err());
}

#[test]
fn test_unsigned_batch_refused() {
    let (sequencer, _) = sequencer_setup(None, true);
    let seq_id = sequencer.svc.enclave_id().unwrap();
    let validator = validator_setup(seq_id, None, true);
    feed_l1_root(&[&sequencer, &validator]);

    sequencer.svc.create_batch(false).unwrap();
    let honest = sequencer.svc.get_batch_by_seq_no(GENESIS_SEQ).unwrap();

    // re-sign the header with a key that is not the sequencer's
    let imposter = EnclaveKey::generate();
    let codec = test_codec();
    let batch = codec.to_batch(&honest).unwrap();
    let (header, body) = batch.into_parts();
    let (signature, rec) = sig::sign_recoverable(&header.header().sighash(), imposter.secret_key());
    let forged = Batch::new(
        SignedBatchHeader::new(header.header().clone(), signature, rec),
        body,
    );
    let forged_ext = codec.to_ext_batch(&forged).unwrap();

    let err = validator.svc.submit_batch(&forged_ext).unwrap_err();
    assert_eq!(err.kind, SystemErrorKind::Internal);
    assert!(err.message.contains("signature"));
}

#[test]
fn test_out_of_order_batch_needs_parent() {
    let (sequencer, _) = sequencer_setup(None, true);
    let seq_id = sequencer.svc.enclave_id().unwrap();
    let validator = validator_setup(seq_id, None, true);
    feed_l1_root(&[&sequencer, &validator]);

    for _ in 0..3 {
        sequencer.svc.create_batch(false).unwrap();
    }
    let ext3 = sequencer.svc.get_batch_by_seq_no(3).unwrap();

    // batch 3 without 2 present: the host must backfill first
    let err = validator.svc.submit_batch(&ext3).unwrap_err();
    assert_eq!(err.kind, SystemErrorKind::UserFacing);
    assert!(err.message.contains("parent"));
}
