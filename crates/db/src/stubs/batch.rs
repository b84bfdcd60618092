use std::collections::HashMap;

use parking_lot::Mutex;
use velum_state::prelude::*;

use crate::{
    errors::DbError,
    traits::BatchDatabase,
    types::{BatchRecord, PublicTxEntry},
    DbResult,
};

#[derive(Default)]
pub struct StubBatchDb {
    batches: Mutex<HashMap<BatchId, BatchRecord>>,
    by_seq: Mutex<HashMap<u64, BatchId>>,
    tx_index: Mutex<HashMap<TxId, BatchId>>,
    /// Executed transactions in execution order, newest last.
    tx_log: Mutex<Vec<PublicTxEntry>>,
    executed_head: Mutex<Option<BatchId>>,
    contract_count: Mutex<u64>,
}

impl StubBatchDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchDatabase for StubBatchDb {
    fn put_batch(&self, record: BatchRecord) -> DbResult<()> {
        let id = record.batch.id();
        let seq = record.batch.seq_no();
        {
            let mut tbl = self.batches.lock();
            tbl.insert(id, record);
        }
        {
            let mut tbl = self.by_seq.lock();
            tbl.insert(seq, id);
        }
        Ok(())
    }

    fn get_batch(&self, id: BatchId) -> DbResult<Option<BatchRecord>> {
        let tbl = self.batches.lock();
        Ok(tbl.get(&id).cloned())
    }

    fn get_batch_by_seq(&self, seq: u64) -> DbResult<Option<BatchRecord>> {
        let id = {
            let tbl = self.by_seq.lock();
            tbl.get(&seq).copied()
        };
        match id {
            Some(id) => self.get_batch(id),
            None => Ok(None),
        }
    }

    fn get_current_seq(&self) -> DbResult<Option<u64>> {
        let tbl = self.by_seq.lock();
        Ok(tbl.keys().max().copied())
    }

    fn put_execution(&self, id: BatchId, receipts: Vec<Receipt>) -> DbResult<()> {
        let mut tbl = self.batches.lock();
        let record = tbl.get_mut(&id).ok_or(DbError::NotFound)?;

        let height = record.batch.header().height;
        let mut tx_index = self.tx_index.lock();
        let mut tx_log = self.tx_log.lock();
        let mut contracts = self.contract_count.lock();
        for rcpt in &receipts {
            if rcpt.contract_address.is_some() {
                *contracts += 1;
            }
            tx_index.insert(rcpt.tx, id);
            tx_log.push(PublicTxEntry {
                tx: rcpt.tx,
                batch: id,
                batch_height: height,
            });
        }

        record.receipts = Some(receipts);
        Ok(())
    }

    fn set_executed_head(&self, id: BatchId) -> DbResult<()> {
        *self.executed_head.lock() = Some(id);
        Ok(())
    }

    fn get_executed_head(&self) -> DbResult<Option<BatchId>> {
        Ok(*self.executed_head.lock())
    }

    fn get_tx_batch(&self, tx: TxId) -> DbResult<Option<BatchId>> {
        let tbl = self.tx_index.lock();
        Ok(tbl.get(&tx).copied())
    }

    fn count_executed_txs(&self) -> DbResult<u64> {
        Ok(self.tx_log.lock().len() as u64)
    }

    fn get_tx_page(&self, offset: u64, limit: u64) -> DbResult<Vec<PublicTxEntry>> {
        let log = self.tx_log.lock();
        Ok(log
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn count_contracts(&self) -> DbResult<u64> {
        Ok(*self.contract_count.lock())
    }
}
