//! Extracts rollups published through the management contract out of L1
//! receipts.

use std::sync::Arc;

use tracing::*;
use velum_crypto::{sig, CryptoError};
use velum_primitives::buf::Buf20;
use velum_state::prelude::*;
use velum_storage::NodeStorage;

use crate::{
    codec::PayloadCodec,
    errors::{Error, Result},
    rollup::rollup_added_topic,
};

pub struct RollupConsumer {
    storage: Arc<NodeStorage>,
    codec: Arc<PayloadCodec>,
    sequencer_id: Buf20,
    management_address: Buf20,
}

impl RollupConsumer {
    pub fn new(
        storage: Arc<NodeStorage>,
        codec: Arc<PayloadCodec>,
        sequencer_id: Buf20,
        management_address: Buf20,
    ) -> Self {
        Self {
            storage,
            codec,
            sequencer_id,
            management_address,
        }
    }

    /// Processes every rollup event in the block, in receipt order.
    /// Returns `DuplicateRollup` (after handling the rest) when any
    /// event re-announced a known rollup.
    pub fn process_rollups_in_block(&self, bundle: &L1BlockBundle) -> Result<()> {
        let topic = rollup_added_topic();
        let mut duplicate = None;

        for receipt in bundle.receipts() {
            for log in &receipt.logs {
                if log.address != self.management_address || log.topics.first() != Some(&topic) {
                    continue;
                }
                let ext: ExtRollup = match borsh::from_slice(&log.data) {
                    Ok(r) => r,
                    Err(err) => {
                        warn!(%err, block = %bundle.id(), "undecodable rollup event, skipping");
                        continue;
                    }
                };
                match self.process_rollup(&ext) {
                    Ok(()) => {}
                    Err(Error::DuplicateRollup(id)) => {
                        debug!(rollup = %id, "ignoring duplicate rollup");
                        duplicate = Some(id);
                    }
                    Err(Error::Crypto(CryptoError::NoKey)) => {
                        debug!("no shared secret yet, cannot open rollup payloads");
                    }
                    Err(err) => {
                        warn!(%err, "failed processing rollup from L1");
                    }
                }
            }
        }

        match duplicate {
            Some(id) => Err(Error::DuplicateRollup(id)),
            None => Ok(()),
        }
    }

    fn process_rollup(&self, ext: &ExtRollup) -> Result<()> {
        let id = ext.id();
        if self.storage.rollup().has_rollup_blocking(&id)? {
            return Err(Error::DuplicateRollup(id));
        }

        let (signature, rec) = ext.header.signature();
        sig::verify_signer(
            &ext.header.header().sighash(),
            signature,
            rec,
            &self.sequencer_id,
        )?;

        let batches = self.codec.unbundle_rollup(ext)?;
        for batch in &batches {
            if self.storage.batch().get_batch_blocking(&batch.id())?.is_none() {
                // the host backfills missing batches over p2p
                warn!(
                    seq = batch.seq_no(),
                    batch = %batch.id(),
                    "rollup references batch we don't hold yet"
                );
            }
        }

        info!(
            rollup = %id,
            from = ext.header.header().from_seq,
            to = ext.header.header().to_seq,
            "consumed rollup from L1"
        );
        self.storage.rollup().put_rollup_blocking(ext.header.clone())?;
        Ok(())
    }
}
