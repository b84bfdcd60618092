//! Execution receipts and their logs.

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use velum_primitives::{
    buf::{Buf20, Buf32},
    hash,
};

use crate::id::TxId;

/// A single log record emitted during execution.
#[derive(
    Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct Log {
    pub address: Buf20,
    pub topics: Vec<Buf32>,
    pub data: Vec<u8>,
}

/// Outcome of executing one transaction (or one synthetic cross-chain
/// message) inside a batch.
#[derive(
    Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct Receipt {
    /// Transaction this receipt belongs to.
    pub tx: TxId,

    /// Whether execution succeeded.
    pub success: bool,

    /// Gas consumed by this transaction alone.
    pub gas_used: u64,

    /// Address of the contract account created by this transaction, if any.
    pub contract_address: Option<Buf20>,

    pub logs: Vec<Log>,
}

impl Receipt {
    pub fn status(&self) -> u8 {
        self.success as u8
    }
}

/// Commits to an ordered list of receipts.
pub fn receipts_root(receipts: &[Receipt]) -> Buf32 {
    hash::compute_borsh_hash(&receipts.to_vec())
}

const BLOOM_BYTES: usize = 256;

/// Fixed-size filter over the log addresses and topics of a batch.
///
/// Membership bits are derived from our native hash rather than the
/// Ethereum keccak scheme, so blooms are only comparable between enclaves
/// of this network.
#[derive(Clone, Eq, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct LogsBloom([u8; BLOOM_BYTES]);

impl LogsBloom {
    pub fn zero() -> Self {
        Self([0; BLOOM_BYTES])
    }

    fn bit_indexes(item: &[u8]) -> [usize; 3] {
        let digest = hash::raw(item);
        let d: &[u8; 32] = digest.as_ref();
        let mut out = [0usize; 3];
        for (i, slot) in out.iter_mut().enumerate() {
            let hi = d[i * 2] as usize;
            let lo = d[i * 2 + 1] as usize;
            *slot = (hi << 8 | lo) % (BLOOM_BYTES * 8);
        }
        out
    }

    pub fn insert(&mut self, item: &[u8]) {
        for idx in Self::bit_indexes(item) {
            self.0[idx / 8] |= 1 << (idx % 8);
        }
    }

    pub fn contains(&self, item: &[u8]) -> bool {
        Self::bit_indexes(item)
            .iter()
            .all(|idx| self.0[idx / 8] & (1 << (idx % 8)) != 0)
    }

    pub fn accrue_log(&mut self, log: &Log) {
        self.insert(log.address.as_slice());
        for topic in &log.topics {
            self.insert(topic.as_slice());
        }
    }

    pub fn accrue_receipts(&mut self, receipts: &[Receipt]) {
        for rcpt in receipts {
            for log in &rcpt.logs {
                self.accrue_log(log);
            }
        }
    }
}

impl std::fmt::Debug for LogsBloom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the full 512 hex chars are useless in logs
        write!(f, "LogsBloom({})", hex::encode(&self.0[..8]))
    }
}

impl<'a> Arbitrary<'a> for LogsBloom {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let mut array = [0u8; BLOOM_BYTES];
        u.fill_buffer(&mut array)?;
        Ok(LogsBloom(array))
    }
}

impl Serialize for LogsBloom {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for LogsBloom {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        let raw = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let array: [u8; BLOOM_BYTES] = raw
            .try_into()
            .map_err(|_| serde::de::Error::custom("bloom: bad length"))?;
        Ok(LogsBloom(array))
    }
}

/// Filter predicate for log subscriptions and `get_logs` queries.
///
/// Empty address list matches any address.  Topic lists are positional, an
/// empty list at a position matches any topic there.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LogFilter {
    pub addresses: Vec<Buf20>,
    pub topics: Vec<Vec<Buf32>>,
    pub from_batch: Option<u64>,
}

impl LogFilter {
    pub fn matches(&self, log: &Log) -> bool {
        if !self.addresses.is_empty() && !self.addresses.contains(&log.address) {
            return false;
        }
        for (pos, wanted) in self.topics.iter().enumerate() {
            if wanted.is_empty() {
                continue;
            }
            match log.topics.get(pos) {
                Some(t) if wanted.contains(t) => {}
                _ => return false,
            }
        }
        true
    }
}
