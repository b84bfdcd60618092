use std::num::NonZeroUsize;
use std::sync::Arc;

use threadpool::ThreadPool;
use velum_db::{
    traits::BatchDatabase,
    types::{BatchRecord, PublicTxEntry},
    DbResult,
};
use velum_state::prelude::*;

use crate::{cache, ops};

/// Caching interface over the batch store.
pub struct BatchManager {
    ops: ops::batch::BatchDataOps,
    batch_cache: cache::CacheTable<BatchId, Option<BatchRecord>>,
}

impl BatchManager {
    pub fn new<D: BatchDatabase + Sync + Send + 'static>(pool: ThreadPool, db: Arc<D>) -> Self {
        let ops = ops::batch::BatchDataOps::new(pool, db);
        let batch_cache = cache::CacheTable::new(NonZeroUsize::new(128).unwrap());
        Self { ops, batch_cache }
    }

    pub fn put_batch_blocking(&self, record: BatchRecord) -> DbResult<()> {
        let id = record.batch.id();
        self.ops.put_batch_blocking(record)?;
        self.batch_cache.purge_blocking(&id);
        Ok(())
    }

    pub fn get_batch_blocking(&self, id: &BatchId) -> DbResult<Option<BatchRecord>> {
        self.batch_cache
            .get_or_fetch_blocking(id, || self.ops.get_batch_blocking(*id))
    }

    pub async fn get_batch_async(&self, id: &BatchId) -> DbResult<Option<BatchRecord>> {
        self.batch_cache
            .get_or_fetch_async(id, || self.ops.get_batch_chan(*id))
            .await
    }

    /// Seq lookups skip the cache; they're cold paths.
    pub fn get_batch_by_seq_blocking(&self, seq: u64) -> DbResult<Option<BatchRecord>> {
        self.ops.get_batch_by_seq_blocking(seq)
    }

    pub fn get_current_seq_blocking(&self) -> DbResult<Option<u64>> {
        self.ops.get_current_seq_blocking()
    }

    pub fn put_execution_blocking(&self, id: BatchId, receipts: Vec<Receipt>) -> DbResult<()> {
        self.ops.put_execution_blocking(id, receipts)?;
        self.batch_cache.purge_blocking(&id);
        Ok(())
    }

    pub fn set_executed_head_blocking(&self, id: BatchId) -> DbResult<()> {
        self.ops.set_executed_head_blocking(id)
    }

    pub fn get_executed_head_blocking(&self) -> DbResult<Option<BatchId>> {
        self.ops.get_executed_head_blocking()
    }

    /// Record of the current executed head, if any.
    pub fn get_executed_head_record_blocking(&self) -> DbResult<Option<BatchRecord>> {
        match self.get_executed_head_blocking()? {
            Some(id) => self.get_batch_blocking(&id),
            None => Ok(None),
        }
    }

    pub fn get_tx_batch_blocking(&self, tx: TxId) -> DbResult<Option<BatchId>> {
        self.ops.get_tx_batch_blocking(tx)
    }

    pub fn count_executed_txs_blocking(&self) -> DbResult<u64> {
        self.ops.count_executed_txs_blocking()
    }

    pub fn get_tx_page_blocking(&self, offset: u64, limit: u64) -> DbResult<Vec<PublicTxEntry>> {
        self.ops.get_tx_page_blocking(offset, limit)
    }

    pub fn count_contracts_blocking(&self) -> DbResult<u64> {
        self.ops.count_contracts_blocking()
    }
}
