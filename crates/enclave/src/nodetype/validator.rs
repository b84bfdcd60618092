//! The validator role: verifies the sequencer's batches and re-executes
//! them, refusing to advance past any divergence.

use std::sync::Arc;

use tracing::*;
use velum_crypto::sig;
use velum_primitives::buf::Buf20;
use velum_state::prelude::*;
use velum_storage::NodeStorage;

use crate::{
    errors::{Error, Result},
    exec::{BatchExecutor, BatchRegistry},
};

pub struct Validator {
    executor: Arc<BatchExecutor>,
    registry: Arc<BatchRegistry>,
    storage: Arc<NodeStorage>,
    sequencer_id: Buf20,
}

impl Validator {
    pub fn new(
        executor: Arc<BatchExecutor>,
        registry: Arc<BatchRegistry>,
        storage: Arc<NodeStorage>,
        sequencer_id: Buf20,
    ) -> Self {
        Self {
            executor,
            registry,
            storage,
            sequencer_id,
        }
    }

    /// Checks that a batch header was signed by the sole sequencer
    /// identity.
    pub fn verify_sequencer_signature(&self, batch: &Batch) -> Result<()> {
        let (signature, rec) = batch.signed_header().signature();
        sig::verify_signer(
            &batch.header().sighash(),
            signature,
            rec,
            &self.sequencer_id,
        )
        .map_err(|_| Error::InvalidSequencerSignature(batch.id()))
    }

    /// Walks seq forward from the executed head, replaying every stored
    /// batch and asserting the sequencer's roots.  A mismatch refuses to
    /// advance the head past the divergent batch.
    pub fn execute_stored_batches(&self) -> Result<()> {
        loop {
            let next_seq = match self.storage.batch().get_executed_head_record_blocking()? {
                Some(record) => record.batch.seq_no() + 1,
                None => GENESIS_SEQ,
            };

            let Some(record) = self.storage.batch().get_batch_by_seq_blocking(next_seq)? else {
                return Ok(());
            };
            let batch = record.batch;

            let computed = self.executor.replay_batch(&batch)?;

            let header = batch.header();
            if computed.state_root() != header.state_root
                || computed.receipts_root() != header.receipts_root
                || computed.gas_used != header.gas_used
            {
                error!(
                    seq = next_seq,
                    batch = %batch.id(),
                    expected_state = %header.state_root,
                    computed_state = %computed.state_root(),
                    "state divergence, refusing to advance head"
                );
                return Err(Error::StateDivergence {
                    batch: batch.id(),
                    seq: next_seq,
                });
            }

            self.executor.commit_batch(&batch, &computed)?;
            debug!(seq = next_seq, batch = %batch.id(), "executed stored batch");
            self.registry.publish(&batch, &computed.receipts);
        }
    }

    pub fn on_l1_block(&self, _bundle: &L1BlockBundle, _ingestion: &BlockIngestion) -> Result<()> {
        // drain any batches that arrived while we lacked their parents
        self.execute_stored_batches()
    }

    pub fn on_l1_fork(&self, fork: &ChainFork) -> Result<()> {
        warn!(
            ancestor = %fork.common_ancestor,
            "validator observed L1 fork"
        );
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        Ok(())
    }
}
