//! Composite record types stored through the database traits.

use borsh::{BorshDeserialize, BorshSerialize};
use velum_primitives::buf::Buf32;
use velum_state::prelude::*;

/// A batch as persisted: the opened batch, the L1-style converted header
/// hash computed at ingestion, and, once executed, its receipts.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct BatchRecord {
    pub batch: Batch,
    pub converted_hash: Buf32,
    pub receipts: Option<Vec<Receipt>>,
}

impl BatchRecord {
    pub fn new(batch: Batch, converted_hash: Buf32) -> Self {
        Self {
            batch,
            converted_hash,
            receipts: None,
        }
    }

    pub fn is_executed(&self) -> bool {
        self.receipts.is_some()
    }
}

/// Entry of the public transaction listing.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct PublicTxEntry {
    pub tx: TxId,
    pub batch: BatchId,
    pub batch_height: u64,
}
