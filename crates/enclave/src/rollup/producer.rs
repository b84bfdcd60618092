//! Bundles committed batches into signed rollups for L1 publication.

use std::sync::Arc;

use tracing::*;
use velum_state::prelude::*;
use velum_storage::NodeStorage;

use crate::{
    codec::PayloadCodec,
    errors::{Error, Result},
    vault::KeyVault,
};

pub struct RollupProducer {
    storage: Arc<NodeStorage>,
    codec: Arc<PayloadCodec>,
    vault: Arc<KeyVault>,
    max_rollup_size: usize,
}

impl RollupProducer {
    pub fn new(
        storage: Arc<NodeStorage>,
        codec: Arc<PayloadCodec>,
        vault: Arc<KeyVault>,
        max_rollup_size: usize,
    ) -> Self {
        Self {
            storage,
            codec,
            vault,
            max_rollup_size,
        }
    }

    /// Builds a rollup over `[from_seq, head_seq]`.  If the bundle would
    /// exceed the size limit the range is truncated at the highest seq
    /// that still fits; an empty rollup is never produced.
    pub fn create_rollup(&self, from_seq: u64, head_seq: u64) -> Result<ExtRollup> {
        if from_seq > head_seq {
            return Err(Error::InvalidRequest(format!(
                "rollup range starts at {from_seq} beyond head {head_seq}"
            )));
        }

        let l1_proof = self
            .storage
            .l1()
            .get_canonical_tip_blocking()?
            .ok_or(Error::NoL1Head)?;

        let mut batches = Vec::with_capacity((head_seq - from_seq + 1) as usize);
        for seq in from_seq..=head_seq {
            let record = self
                .storage
                .batch()
                .get_batch_by_seq_blocking(seq)?
                .ok_or(Error::MissingBatchSeq(seq))?;
            batches.push(record.batch);
        }

        let mut count = batches.len();
        while count > 0 {
            let header = RollupHeader {
                from_seq,
                to_seq: from_seq + count as u64 - 1,
                l1_proof,
            };
            let (sig, rec) = self.vault.sign(&header.sighash());
            let signed = SignedRollupHeader::new(header, sig, rec);
            let blob = self.codec.bundle_rollup(&signed, &batches[..count])?;

            if blob.len() <= self.max_rollup_size {
                if count < batches.len() {
                    info!(
                        from_seq,
                        truncated_to = signed.header().to_seq,
                        requested_to = head_seq,
                        "rollup range truncated to fit size limit"
                    );
                }
                self.storage.rollup().put_rollup_blocking(signed.clone())?;
                return Ok(ExtRollup {
                    header: signed,
                    batch_payloads: blob,
                });
            }
            count -= 1;
        }

        Err(Error::RollupOversize)
    }
}
