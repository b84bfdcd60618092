//! Rollups: signed bundles of consecutive batches published to the L1 for
//! data availability.

use std::io::{self, Cursor, Write};

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use velum_primitives::{
    buf::{Buf32, Buf64},
    hash,
};

use crate::id::{L1BlockId, RollupId};

/// Header of a rollup, committing to an inclusive range of sequencer
/// numbers and the L1 block the rollup anchors to.
#[derive(
    Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct RollupHeader {
    pub from_seq: u64,
    pub to_seq: u64,
    pub l1_proof: L1BlockId,
}

impl RollupHeader {
    pub fn sighash(&self) -> Buf32 {
        // 8 + 8 + 32 = 48
        let mut buf = [0; 48];
        fill_sighash_buf(self, &mut buf).expect("rollup: compute sighash");
        hash::raw(&buf)
    }

    pub fn batch_count(&self) -> u64 {
        self.to_seq - self.from_seq + 1
    }
}

fn fill_sighash_buf(header: &RollupHeader, buf: &mut [u8]) -> Result<(), io::Error> {
    let mut cur = Cursor::new(&mut buf[..]);
    cur.write_all(&header.from_seq.to_be_bytes())?;
    cur.write_all(&header.to_seq.to_be_bytes())?;
    cur.write_all(header.l1_proof.as_ref())?;

    #[cfg(test)]
    if cur.position() as usize != buf.len() {
        panic!("rollup: did not exactly fill sighash buffer");
    }

    Ok(())
}

#[derive(
    Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct SignedRollupHeader {
    header: RollupHeader,
    signature: Buf64,
    sig_recovery: u8,
}

impl SignedRollupHeader {
    pub fn new(header: RollupHeader, signature: Buf64, sig_recovery: u8) -> Self {
        Self {
            header,
            signature,
            sig_recovery,
        }
    }

    pub fn header(&self) -> &RollupHeader {
        &self.header
    }

    pub fn signature(&self) -> (&Buf64, u8) {
        (&self.signature, self.sig_recovery)
    }

    pub fn id(&self) -> RollupId {
        RollupId::from(hash::compute_borsh_hash(self))
    }
}

/// The externally-shipped rollup: signed header plus the compressed bundle
/// of the included batches' headers and payloads.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct ExtRollup {
    pub header: SignedRollupHeader,
    pub batch_payloads: Vec<u8>,
}

impl ExtRollup {
    pub fn id(&self) -> RollupId {
        self.header.id()
    }
}
