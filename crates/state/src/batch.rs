//! L2 batches: the blocks of the rollup chain.

use std::io::{self, Cursor, Write};

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use velum_primitives::{
    buf::{Buf32, Buf64},
    hash,
};

use crate::{
    id::{BatchId, L1BlockId},
    msg::CrossChainMessage,
    receipt::LogsBloom,
    tx::Transaction,
};

/// Sequencer number of the genesis batch.  Numbers are dense from here.
pub const GENESIS_SEQ: u64 = 1;

/// Header of an L2 batch.
#[derive(
    Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct BatchHeader {
    /// Position in the sequencer's total order, strictly parent + 1.
    pub seq_no: u64,

    /// Chain height, equal to `seq_no` in the current protocol but kept
    /// separate for forward compatibility.
    pub height: u64,

    /// Hash of the parent batch's signed header.  Zero for genesis.
    pub parent: BatchId,

    /// L1 block finalising this batch's ordering.
    pub l1_proof: L1BlockId,

    /// Timestamp chosen by the sequencer.  Execution time comes from here,
    /// never from a clock.
    pub timestamp: u64,

    pub state_root: Buf32,

    pub txs_root: Buf32,

    pub receipts_root: Buf32,

    pub logs_bloom: LogsBloom,

    pub gas_used: u64,
}

impl BatchHeader {
    /// Digest the sequencer signs.  Fixed-layout, every field in order.
    pub fn sighash(&self) -> Buf32 {
        // 8 + 8 + 32 + 32 + 8 + 32 + 32 + 32 + 256 + 8 = 448
        let mut buf = [0; 448];
        fill_sighash_buf(self, &mut buf).expect("batch: compute sighash");
        hash::raw(&buf)
    }
}

fn fill_sighash_buf(header: &BatchHeader, buf: &mut [u8]) -> Result<(), io::Error> {
    let mut cur = Cursor::new(&mut buf[..]);
    cur.write_all(&header.seq_no.to_be_bytes())?;
    cur.write_all(&header.height.to_be_bytes())?;
    cur.write_all(header.parent.as_ref())?;
    cur.write_all(header.l1_proof.as_ref())?;
    cur.write_all(&header.timestamp.to_be_bytes())?;
    cur.write_all(header.state_root.as_ref())?;
    cur.write_all(header.txs_root.as_ref())?;
    cur.write_all(header.receipts_root.as_ref())?;
    cur.write_all(&borsh::to_vec(&header.logs_bloom).expect("batch: enc bloom"))?;
    cur.write_all(&header.gas_used.to_be_bytes())?;

    #[cfg(test)]
    if cur.position() as usize != buf.len() {
        panic!("batch: did not exactly fill sighash buffer");
    }

    Ok(())
}

/// A batch header together with the sequencer's signature over its sighash.
#[derive(
    Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct SignedBatchHeader {
    header: BatchHeader,
    signature: Buf64,
    sig_recovery: u8,
}

impl SignedBatchHeader {
    pub fn new(header: BatchHeader, signature: Buf64, sig_recovery: u8) -> Self {
        Self {
            header,
            signature,
            sig_recovery,
        }
    }

    pub fn header(&self) -> &BatchHeader {
        &self.header
    }

    pub fn signature(&self) -> (&Buf64, u8) {
        (&self.signature, self.sig_recovery)
    }

    /// The batch id is the hash of the whole signed header.
    pub fn id(&self) -> BatchId {
        BatchId::from(hash::compute_borsh_hash(self))
    }
}

/// Payload of a batch: the ordered transactions plus the cross-chain
/// messages the sequencer consumed from the L1 at this point.
#[derive(
    Clone, Debug, Default, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize,
    Deserialize,
)]
pub struct BatchBody {
    pub transactions: Vec<Transaction>,
    pub cross_chain: Vec<CrossChainMessage>,
}

impl BatchBody {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.cross_chain.is_empty()
    }

    /// Commitment to the transaction list carried in the header.
    pub fn txs_root(&self) -> Buf32 {
        hash::compute_borsh_hash(&self.transactions)
    }
}

/// A fully-opened batch.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct Batch {
    header: SignedBatchHeader,
    body: BatchBody,
}

impl Batch {
    pub fn new(header: SignedBatchHeader, body: BatchBody) -> Self {
        Self { header, body }
    }

    pub fn id(&self) -> BatchId {
        self.header.id()
    }

    pub fn seq_no(&self) -> u64 {
        self.header.header().seq_no
    }

    pub fn is_genesis(&self) -> bool {
        self.seq_no() == GENESIS_SEQ
    }

    pub fn signed_header(&self) -> &SignedBatchHeader {
        &self.header
    }

    pub fn header(&self) -> &BatchHeader {
        self.header.header()
    }

    pub fn body(&self) -> &BatchBody {
        &self.body
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.body.transactions
    }

    pub fn into_parts(self) -> (SignedBatchHeader, BatchBody) {
        (self.header, self.body)
    }
}

/// The externally-shipped form of a batch: the signed header in clear, the
/// body as an encrypted-then-compressed blob only secret holders can open.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct ExtBatch {
    pub header: SignedBatchHeader,
    pub payload: Vec<u8>,
}

impl ExtBatch {
    pub fn id(&self) -> BatchId {
        self.header.id()
    }

    pub fn seq_no(&self) -> u64 {
        self.header.header().seq_no
    }
}
