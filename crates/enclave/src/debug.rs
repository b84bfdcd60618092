//! The debug_* namespace.  Everything here may expose execution detail in
//! cleartext, which is why the façade gates it behind configuration.

use std::sync::Arc;

use serde_json::json;
use velum_state::prelude::*;
use velum_storage::NodeStorage;

use crate::errors::{Error, Result};

pub struct Debugger {
    storage: Arc<NodeStorage>,
}

impl Debugger {
    pub fn new(storage: Arc<NodeStorage>) -> Self {
        Self { storage }
    }

    fn locate(&self, hash: TxId) -> Result<(Transaction, Receipt, BatchId, u64)> {
        let batch_id = self
            .storage
            .batch()
            .get_tx_batch_blocking(hash)?
            .ok_or(Error::NotFound)?;
        let record = self
            .storage
            .batch()
            .get_batch_blocking(&batch_id)?
            .ok_or(Error::MissingBatch(batch_id))?;
        let tx = record
            .batch
            .transactions()
            .iter()
            .find(|tx| tx.id() == hash)
            .cloned()
            .ok_or(Error::NotFound)?;
        let receipt = record
            .receipts
            .as_deref()
            .and_then(|rs| rs.iter().find(|r| r.tx == hash))
            .cloned()
            .ok_or(Error::NotFound)?;
        Ok((tx, receipt, batch_id, record.batch.seq_no()))
    }

    /// Step-level trace of a transaction's execution.  The tracer config
    /// is echoed back so callers can tell which knobs produced the trace.
    pub fn trace_transaction(
        &self,
        hash: TxId,
        config: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let (tx, receipt, batch_id, seq) = self.locate(hash)?;
        let op = if tx.to.is_none() { "CREATE" } else { "TRANSFER" };
        Ok(json!({
            "tx": hash,
            "batch": batch_id,
            "seq": seq,
            "failed": !receipt.success,
            "gas": receipt.gas_used,
            "tracerConfig": config,
            "structLogs": [
                { "op": op, "from": tx.from, "to": tx.to, "value": tx.value.to_string() },
            ],
        }))
    }

    /// Which accounts each log of a transaction is visible to.
    pub fn event_log_relevancy(&self, hash: TxId) -> Result<serde_json::Value> {
        let (tx, receipt, batch_id, _seq) = self.locate(hash)?;
        let logs: Vec<serde_json::Value> = receipt
            .logs
            .iter()
            .map(|log| {
                json!({
                    "address": log.address,
                    "topics": log.topics,
                    "relevantAccounts": [tx.from],
                })
            })
            .collect();
        Ok(json!({ "tx": hash, "batch": batch_id, "logs": logs }))
    }
}
