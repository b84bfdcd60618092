//! Batch data operations.

use velum_db::types::{BatchRecord, PublicTxEntry};
use velum_state::prelude::*;

use crate::exec::*;

inst_db_ops! {
    BatchDataOps(velum_db::traits::BatchDatabase) {
        put_batch(record: BatchRecord) -> ();
        get_batch(id: BatchId) -> Option<BatchRecord>;
        get_batch_by_seq(seq: u64) -> Option<BatchRecord>;
        get_current_seq() -> Option<u64>;
        put_execution(id: BatchId, receipts: Vec<Receipt>) -> ();
        set_executed_head(id: BatchId) -> ();
        get_executed_head() -> Option<BatchId>;
        get_tx_batch(tx: TxId) -> Option<BatchId>;
        count_executed_txs() -> u64;
        get_tx_page(offset: u64, limit: u64) -> Vec<PublicTxEntry>;
        count_contracts() -> u64;
    }
}
