//! Signed user transactions.

use std::io::{self, Cursor, Write};

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use velum_primitives::{
    buf::{Buf20, Buf32, Buf64},
    hash,
};

use crate::id::TxId;

/// Base gas charged for any transaction.
pub const TX_BASE_GAS: u64 = 21_000;

/// Gas charged per byte of calldata.
pub const TX_DATA_GAS_PER_BYTE: u64 = 16;

/// A value-transfer transaction.  `to == None` creates a new account whose
/// code is the calldata.
#[derive(
    Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct Transaction {
    /// Sender, recoverable from the signature; carried explicitly so that
    /// relayers can route without crypto.
    pub from: Buf20,

    pub to: Option<Buf20>,

    pub value: u128,

    /// Sender account nonce this transaction spends.
    pub nonce: u64,

    pub gas_limit: u64,

    pub gas_price: u64,

    pub data: Vec<u8>,

    /// Compact ECDSA signature over [`Transaction::sighash`].
    pub signature: Buf64,

    /// Recovery id of the signature.
    pub sig_recovery: u8,
}

impl Transaction {
    /// Digest the sender commits to with their signature.  Fixed-layout so
    /// that every enclave agrees byte-for-byte.
    pub fn sighash(&self) -> Buf32 {
        let mut buf = Vec::with_capacity(96 + self.data.len());
        fill_sighash_buf(self, &mut buf).expect("tx: compute sighash");
        hash::raw(&buf)
    }

    /// Hash identifying the transaction, over the full signed encoding.
    pub fn id(&self) -> TxId {
        TxId::from(hash::compute_borsh_hash(self))
    }

    /// Serialized size, the unit the batch byte budget is accounted in.
    pub fn size(&self) -> usize {
        borsh::to_vec(self).expect("tx: serialize").len()
    }

    /// Gas consumed by the transaction independent of execution.
    pub fn intrinsic_gas(&self) -> u64 {
        TX_BASE_GAS + TX_DATA_GAS_PER_BYTE * self.data.len() as u64
    }
}

fn fill_sighash_buf(tx: &Transaction, buf: &mut Vec<u8>) -> Result<(), io::Error> {
    let mut cur = Cursor::new(buf);
    cur.write_all(tx.from.as_slice())?;
    match &tx.to {
        Some(to) => {
            cur.write_all(&[1])?;
            cur.write_all(to.as_slice())?;
        }
        None => cur.write_all(&[0])?,
    }
    cur.write_all(&tx.value.to_be_bytes())?;
    cur.write_all(&tx.nonce.to_be_bytes())?;
    cur.write_all(&tx.gas_limit.to_be_bytes())?;
    cur.write_all(&tx.gas_price.to_be_bytes())?;
    cur.write_all(&tx.data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use velum_primitives::buf::{Buf20, Buf64};

    use super::Transaction;

    fn mktx() -> Transaction {
        Transaction {
            from: Buf20::from([1; 20]),
            to: Some(Buf20::from([2; 20])),
            value: 100,
            nonce: 0,
            gas_limit: 30_000,
            gas_price: 2,
            data: vec![0xaa, 0xbb],
            signature: Buf64::zero(),
            sig_recovery: 0,
        }
    }

    #[test]
    fn test_sighash_excludes_signature() {
        let tx = mktx();
        let mut signed = tx.clone();
        signed.signature = Buf64::from([9; 64]);
        assert_eq!(tx.sighash(), signed.sighash());
        assert_ne!(tx.id(), signed.id());
    }

    #[test]
    fn test_sighash_covers_fields() {
        let tx = mktx();
        let mut other = tx.clone();
        other.value = 101;
        assert_ne!(tx.sighash(), other.sighash());
    }

    #[test]
    fn test_intrinsic_gas() {
        let tx = mktx();
        assert_eq!(tx.intrinsic_gas(), 21_000 + 2 * 16);
    }
}
