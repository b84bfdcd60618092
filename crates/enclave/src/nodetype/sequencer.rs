//! The sequencer role: mints, signs, and commits batches; produces
//! rollups.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::*;
use velum_db::types::BatchRecord;
use velum_state::prelude::*;
use velum_storage::NodeStorage;

use crate::{
    codec::PayloadCodec,
    errors::{Error, Result},
    exec::{BatchContext, BatchExecutor, BatchRegistry},
    l1::CrossChainProcessors,
    mempool::Mempool,
    rollup::RollupProducer,
    vault::KeyVault,
};

#[derive(Clone, Debug)]
pub struct SequencerSettings {
    pub max_batch_size: usize,
    pub batch_gas_limit: u64,
}

pub struct Sequencer {
    executor: Arc<BatchExecutor>,
    registry: Arc<BatchRegistry>,
    storage: Arc<NodeStorage>,
    mempool: Arc<Mempool>,
    crosschain: Arc<CrossChainProcessors>,
    vault: Arc<KeyVault>,
    codec: Arc<PayloadCodec>,
    producer: RollupProducer,
    settings: SequencerSettings,
}

impl Sequencer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        executor: Arc<BatchExecutor>,
        registry: Arc<BatchRegistry>,
        storage: Arc<NodeStorage>,
        mempool: Arc<Mempool>,
        crosschain: Arc<CrossChainProcessors>,
        vault: Arc<KeyVault>,
        codec: Arc<PayloadCodec>,
        producer: RollupProducer,
        settings: SequencerSettings,
    ) -> Self {
        Self {
            executor,
            registry,
            storage,
            mempool,
            crosschain,
            vault,
            codec,
            producer,
            settings,
        }
    }

    /// Mints the next batch.  With `skip_if_empty`, an empty mempool and
    /// no staged cross-chain messages produce nothing; the genesis batch
    /// is always minted so the chain can start.
    pub fn create_batch(&self, skip_if_empty: bool) -> Result<()> {
        let head_seq = self.registry.head_batch_seq();

        let l1_proof = self
            .storage
            .l1()
            .get_canonical_tip_blocking()?
            .ok_or(Error::NoL1Head)?;

        let (parent, seq_no) = match head_seq {
            None => (BatchId::zero(), GENESIS_SEQ),
            Some(head) => {
                let record = self
                    .storage
                    .batch()
                    .get_batch_by_seq_blocking(head)?
                    .ok_or(Error::MissingBatchSeq(head))?;
                (record.batch.id(), head + 1)
            }
        };

        let txs = self
            .mempool
            .take_for_batch(self.settings.max_batch_size, self.settings.batch_gas_limit);
        let msgs = self.crosschain.drain();

        if skip_if_empty && txs.is_empty() && msgs.is_empty() && head_seq.is_some() {
            trace!("no batch work, skipping");
            return Ok(());
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let ctx = BatchContext {
            seq_no,
            height: seq_no,
            parent,
            l1_proof,
            timestamp,
        };
        let computed = self.executor.compute_batch(&ctx, &txs, &msgs, true)?;

        let body = BatchBody {
            transactions: computed.included.clone(),
            cross_chain: msgs,
        };
        let header = BatchHeader {
            seq_no,
            height: seq_no,
            parent,
            l1_proof,
            timestamp,
            state_root: computed.state_root(),
            txs_root: body.txs_root(),
            receipts_root: computed.receipts_root(),
            logs_bloom: computed.logs_bloom(),
            gas_used: computed.gas_used,
        };
        let (signature, rec) = self.vault.sign(&header.sighash());
        let batch = Batch::new(SignedBatchHeader::new(header, signature, rec), body);

        info!(
            seq = seq_no,
            batch = %batch.id(),
            txs = batch.transactions().len(),
            dropped = computed.dropped.len(),
            "minted batch"
        );

        let converted = self.codec.converted_header_hash(batch.signed_header());
        self.storage
            .batch()
            .put_batch_blocking(BatchRecord::new(batch.clone(), converted))?;
        self.executor.commit_batch(&batch, &computed)?;

        let included: Vec<TxId> = batch.transactions().iter().map(|tx| tx.id()).collect();
        self.mempool.remove(&included);

        self.registry.publish(&batch, &computed.receipts);
        Ok(())
    }

    /// Bundles committed batches from `from_seq` up to the head.
    pub fn create_rollup(&self, from_seq: u64) -> Result<ExtRollup> {
        let head = self.registry.head_batch_seq().ok_or(Error::NotInitialised)?;
        self.producer.create_rollup(from_seq, head)
    }

    pub fn on_l1_block(&self, _bundle: &L1BlockBundle, ingestion: &BlockIngestion) -> Result<()> {
        trace!(block = %ingestion.block, "sequencer saw L1 block");
        Ok(())
    }

    pub fn on_l1_fork(&self, fork: &ChainFork) -> Result<()> {
        // batches anchored to abandoned blocks stay valid on the data
        // level; the host re-publishes rollups if the L1 dropped them
        warn!(
            ancestor = %fork.common_ancestor,
            abandoned = fork.abandoned.len(),
            "sequencer observed L1 fork"
        );
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        Ok(())
    }
}
