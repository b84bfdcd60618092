//! L1 reorg handling through the façade.

mod common;

use common::*;
use velum_test_utils::l1_chain_from;

#[test]
fn test_l1_fork_switches_head() {
    let (sequencer, _) = sequencer_setup(None, true);

    // a -> b -> c
    let main = l1_chain_from(None, &[1, 1, 1], 1_700_000_000);
    for block in &main {
        let response = sequencer.svc.submit_l1_block(block.clone()).unwrap();
        assert!(!response.is_fork);
    }

    // a -> b' -> c' -> d' with higher total difficulty
    let side = l1_chain_from(Some(main[0].header()), &[2, 2, 2], 1_700_000_100);
    assert!(!sequencer.svc.submit_l1_block(side[0].clone()).unwrap().is_fork);
    // the side chain overtakes here
    assert!(sequencer.svc.submit_l1_block(side[1].clone()).unwrap().is_fork);
    let response = sequencer.svc.submit_l1_block(side[2].clone()).unwrap();
    assert!(!response.is_fork);

    assert_eq!(
        sequencer.svc.status().unwrap().l1_head,
        Some(side[2].id())
    );
}

#[test]
fn test_resubmission_is_idempotent() {
    let (sequencer, _) = sequencer_setup(None, true);
    let chain = l1_chain_from(None, &[1, 1], 1_700_000_000);

    sequencer.svc.submit_l1_block(chain[0].clone()).unwrap();
    sequencer.svc.submit_l1_block(chain[1].clone()).unwrap();

    // same block again: accepted quietly, head unmoved
    let response = sequencer.svc.submit_l1_block(chain[1].clone()).unwrap();
    assert!(!response.is_fork);
    assert_eq!(sequencer.svc.status().unwrap().l1_head, Some(chain[1].id()));
}

#[test]
fn test_orphan_block_rejected_with_head() {
    let (sequencer, _) = sequencer_setup(None, true);
    let chain = l1_chain_from(None, &[1, 1, 1], 1_700_000_000);

    sequencer.svc.submit_l1_block(chain[0].clone()).unwrap();
    let err = sequencer.svc.submit_l1_block(chain[2].clone()).unwrap_err();
    assert_eq!(
        err.kind,
        velum_enclave::errors::SystemErrorKind::BlockReject
    );
    // the reject carries our current head so the host can resync
    assert_eq!(err.l1_head, Some(chain[0].id()));
}

#[test]
fn test_validator_sees_same_fork() {
    let (sequencer, _) = sequencer_setup(None, true);
    let seq_id = sequencer.svc.enclave_id().unwrap();
    let validator = validator_setup(seq_id, None, true);
    assert_eq!(
        validator.svc.status().unwrap().code,
        velum_enclave::service::StatusCode::Running
    );

    let main = l1_chain_from(None, &[1, 1], 1_700_000_000);
    let side = l1_chain_from(Some(main[0].header()), &[5], 1_700_000_050);
    for block in &main {
        validator.svc.submit_l1_block(block.clone()).unwrap();
    }
    let response = validator.svc.submit_l1_block(side[0].clone()).unwrap();
    assert!(response.is_fork);
    assert_eq!(validator.svc.status().unwrap().l1_head, Some(side[0].id()));
}
