//! The `(validate, execute)` pairs behind each encrypted RPC.

use serde::{Deserialize, Serialize};
use velum_db::types::BatchRecord;
use velum_primitives::buf::Buf20;
use velum_state::{
    prelude::*,
    tx::{TX_BASE_GAS, TX_DATA_GAS_PER_BYTE},
};

use crate::{
    errors::{Error, Result},
    l1::crosschain::address_topic,
};

use super::{BlockRef, EncryptionManager};

// -- submit_tx ---------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitTxParams {
    pub tx: Transaction,
}

pub fn submit_tx_validate(params: &SubmitTxParams) -> Result<Option<Buf20>> {
    Ok(Some(params.tx.from))
}

pub fn submit_tx_execute(
    mgr: &EncryptionManager,
    params: &SubmitTxParams,
    _from: Buf20,
) -> Result<TxId> {
    mgr.mempool().submit(params.tx.clone())
}

// -- get_balance -------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BalanceParams {
    pub address: Buf20,
    pub block: BlockRef,
}

pub fn get_balance_validate(params: &BalanceParams) -> Result<Option<Buf20>> {
    Ok(Some(params.address))
}

pub fn get_balance_execute(
    mgr: &EncryptionManager,
    params: &BalanceParams,
    _from: Buf20,
) -> Result<u128> {
    Ok(mgr.snapshot_at(&params.block)?.balance(&params.address))
}

// -- obs_call ----------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CallParams {
    pub from: Buf20,
    pub to: Option<Buf20>,
    #[serde(default)]
    pub value: Option<u128>,
    #[serde(default)]
    pub data: Option<Vec<u8>>,
    pub block: BlockRef,
}

#[derive(Debug, Serialize)]
pub struct CallResult {
    pub success: bool,
    pub gas_used: u64,
    pub output: String,
}

pub fn obs_call_validate(params: &CallParams) -> Result<Option<Buf20>> {
    Ok(Some(params.from))
}

pub fn obs_call_execute(
    mgr: &EncryptionManager,
    params: &CallParams,
    _from: Buf20,
) -> Result<CallResult> {
    let snapshot = mgr.snapshot_at(&params.block)?;
    let gas_used = intrinsic_gas(params.data.as_deref());
    if gas_used > mgr.local_execution_cap() {
        return Err(Error::InvalidRequest(
            "call exceeds local execution cap".into(),
        ));
    }
    let value = params.value.unwrap_or(0);
    let success = snapshot.balance(&params.from) >= value;
    // calling a stored-code account returns its code blob
    let output = match &params.to {
        Some(to) => format!("0x{}", hex::encode(snapshot.code(to))),
        None => "0x".into(),
    };
    Ok(CallResult {
        success,
        gas_used,
        output,
    })
}

// -- get_transaction / get_transaction_receipt -------------------------

#[derive(Debug, Deserialize)]
pub struct TxHashParams {
    pub hash: TxId,
}

pub fn tx_lookup_validate(_params: &TxHashParams) -> Result<Option<Buf20>> {
    // ownership is only known after the lookup
    Ok(None)
}

/// Finds a transaction and its batch, checking the requester owns it.
fn find_owned_tx(
    mgr: &EncryptionManager,
    hash: TxId,
    from: Buf20,
) -> Result<(BatchRecord, Transaction)> {
    let batch_id = mgr
        .storage()
        .batch()
        .get_tx_batch_blocking(hash)?
        .ok_or(Error::NotFound)?;
    let record = mgr
        .storage()
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
    if tx.from != from {
        return Err(Error::Unauthorized);
    }
    Ok((record, tx))
}

#[derive(Debug, Serialize)]
pub struct TxView {
    pub tx: Transaction,
    pub batch: BatchId,
    pub batch_height: u64,
}

pub fn get_transaction_execute(
    mgr: &EncryptionManager,
    params: &TxHashParams,
    from: Buf20,
) -> Result<TxView> {
    let (record, tx) = find_owned_tx(mgr, params.hash, from)?;
    Ok(TxView {
        tx,
        batch: record.batch.id(),
        batch_height: record.batch.header().height,
    })
}

#[derive(Debug, Serialize)]
pub struct ReceiptView {
    pub tx: TxId,
    pub status: u8,
    pub gas_used: u64,
    pub contract_address: Option<Buf20>,
    pub logs: Vec<Log>,
    pub batch: BatchId,
}

pub fn get_transaction_receipt_execute(
    mgr: &EncryptionManager,
    params: &TxHashParams,
    from: Buf20,
) -> Result<ReceiptView> {
    let (record, _tx) = find_owned_tx(mgr, params.hash, from)?;
    let receipts = record.receipts.as_deref().ok_or(Error::NotFound)?;
    let receipt = receipts
        .iter()
        .find(|r| r.tx == params.hash)
        .ok_or(Error::NotFound)?;
    Ok(ReceiptView {
        tx: receipt.tx,
        status: receipt.status(),
        gas_used: receipt.gas_used,
        contract_address: receipt.contract_address,
        logs: receipt.logs.clone(),
        batch: record.batch.id(),
    })
}

// -- get_transaction_count ---------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TxCountParams {
    pub address: Buf20,
    pub block: BlockRef,
}

pub fn get_transaction_count_validate(params: &TxCountParams) -> Result<Option<Buf20>> {
    Ok(Some(params.address))
}

pub fn get_transaction_count_execute(
    mgr: &EncryptionManager,
    params: &TxCountParams,
    _from: Buf20,
) -> Result<u64> {
    Ok(mgr.snapshot_at(&params.block)?.nonce(&params.address))
}

// -- get_logs ----------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LogsParams {
    pub requester: Buf20,
    pub filter: LogFilter,
}

pub fn get_logs_validate(params: &LogsParams) -> Result<Option<Buf20>> {
    Ok(Some(params.requester))
}

/// A log is visible to a requester when it names them, either as the
/// emitting address, a topic, or the sender of the carrying transaction.
fn log_relevant_to(log: &Log, tx_sender: Option<&Buf20>, requester: &Buf20) -> bool {
    if log.address == *requester {
        return true;
    }
    if log.topics.contains(&address_topic(requester)) {
        return true;
    }
    tx_sender == Some(requester)
}

pub fn get_logs_execute(
    mgr: &EncryptionManager,
    params: &LogsParams,
    from: Buf20,
) -> Result<Vec<Log>> {
    let head = match mgr.registry().head_batch_seq() {
        Some(head) => head,
        None => return Ok(Vec::new()),
    };
    let mut out = Vec::new();
    for seq in params.filter.from_batch.unwrap_or(GENESIS_SEQ)..=head {
        let Some(record) = mgr.storage().batch().get_batch_by_seq_blocking(seq)? else {
            continue;
        };
        let Some(receipts) = record.receipts.as_deref() else {
            continue;
        };
        for receipt in receipts {
            let sender = record
                .batch
                .transactions()
                .iter()
                .find(|tx| tx.id() == receipt.tx)
                .map(|tx| tx.from);
            for log in &receipt.logs {
                if params.filter.matches(log) && log_relevant_to(log, sender.as_ref(), &from) {
                    out.push(log.clone());
                }
            }
        }
    }
    Ok(out)
}

// -- estimate_gas ------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct EstimateGasParams {
    pub from: Buf20,
    pub to: Option<Buf20>,
    #[serde(default)]
    pub value: Option<u128>,
    #[serde(default)]
    pub data: Option<Vec<u8>>,
}

pub fn estimate_gas_validate(params: &EstimateGasParams) -> Result<Option<Buf20>> {
    Ok(Some(params.from))
}

pub fn estimate_gas_execute(
    mgr: &EncryptionManager,
    params: &EstimateGasParams,
    _from: Buf20,
) -> Result<u64> {
    let gas = intrinsic_gas(params.data.as_deref());
    if gas > mgr.local_execution_cap() {
        return Err(Error::InvalidRequest(
            "estimation exceeds local execution cap".into(),
        ));
    }
    Ok(gas)
}

fn intrinsic_gas(data: Option<&[u8]>) -> u64 {
    TX_BASE_GAS + TX_DATA_GAS_PER_BYTE * data.map(|d| d.len() as u64).unwrap_or(0)
}

// -- get_custom_query --------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CustomQueryParams {
    pub address: Buf20,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Serialize)]
pub struct PrivateTxListing {
    pub receipts: Vec<ReceiptView>,
    pub total: u64,
}

pub fn get_custom_query_validate(params: &CustomQueryParams) -> Result<Option<Buf20>> {
    Ok(Some(params.address))
}

/// Lists the requester's own executed transactions, newest first.
pub fn get_custom_query_execute(
    mgr: &EncryptionManager,
    params: &CustomQueryParams,
    from: Buf20,
) -> Result<PrivateTxListing> {
    let head = mgr.registry().head_batch_seq().unwrap_or(0);
    let mut all = Vec::new();
    for seq in (GENESIS_SEQ..=head).rev() {
        let Some(record) = mgr.storage().batch().get_batch_by_seq_blocking(seq)? else {
            continue;
        };
        let Some(receipts) = record.receipts.as_deref() else {
            continue;
        };
        for receipt in receipts {
            let owned = record
                .batch
                .transactions()
                .iter()
                .any(|tx| tx.id() == receipt.tx && tx.from == from);
            if owned {
                all.push(ReceiptView {
                    tx: receipt.tx,
                    status: receipt.status(),
                    gas_used: receipt.gas_used,
                    contract_address: receipt.contract_address,
                    logs: receipt.logs.clone(),
                    batch: record.batch.id(),
                });
            }
        }
    }
    let total = all.len() as u64;
    let receipts = all
        .into_iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .collect();
    Ok(PrivateTxListing { receipts, total })
}
