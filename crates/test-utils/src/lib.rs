//! Helpers for generating test data across the workspace.

use arbitrary::{Arbitrary, Unstructured};
use rand::{rngs::OsRng, thread_rng, RngCore};
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use velum_primitives::buf::Buf20;
use velum_state::{
    l1::L1BlockHeader,
    prelude::*,
    receipt::receipts_root,
    tx::Transaction,
};

// Smaller buffer size as compared to 2^24
const ARB_GEN_LEN: usize = 16384;

pub struct ArbitraryGenerator {
    rng: rand::rngs::ThreadRng, // Thread-local RNG
    buf: Vec<u8>,               // Persistent buffer
}

impl Default for ArbitraryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitraryGenerator {
    pub fn new() -> Self {
        ArbitraryGenerator {
            rng: thread_rng(),
            buf: vec![0u8; ARB_GEN_LEN],
        }
    }

    pub fn generate<'a, T: Arbitrary<'a> + Clone>(&'a mut self) -> T {
        self.rng.fill_bytes(&mut self.buf);
        let mut u = Unstructured::new(&self.buf);
        T::arbitrary(&mut u).expect("failed to generate arbitrary instance")
    }
}

/// A funded test identity: a keypair plus its derived address.
pub struct TestAccount {
    pub sk: SecretKey,
    pub pk: PublicKey,
    pub address: Buf20,
}

impl TestAccount {
    pub fn generate() -> Self {
        let sk = SecretKey::new(&mut OsRng);
        let pk = PublicKey::from_secret_key(SECP256K1, &sk);
        let address = velum_crypto::sig::address_from_pubkey(&pk);
        Self { sk, pk, address }
    }

    /// Builds and signs a plain transfer from this account.
    pub fn signed_transfer(&self, to: Buf20, value: u128, nonce: u64) -> Transaction {
        let mut tx = Transaction {
            from: self.address,
            to: Some(to),
            value,
            nonce,
            gas_limit: 30_000,
            gas_price: 10,
            data: vec![],
            signature: velum_primitives::buf::Buf64::zero(),
            sig_recovery: 0,
        };
        let (sig, rec) = velum_crypto::sig::sign_recoverable(&tx.sighash(), &self.sk);
        tx.signature = sig;
        tx.sig_recovery = rec;
        tx
    }
}

/// Builds a linear chain of L1 block bundles on top of `parent`, one
/// per entry in `difficulties`.
pub fn l1_chain_from(
    parent: Option<&L1BlockHeader>,
    difficulties: &[u64],
    base_timestamp: u64,
) -> Vec<L1BlockBundle> {
    let mut out = Vec::with_capacity(difficulties.len());
    let (mut height, mut parent_id) = match parent {
        Some(p) => (p.height + 1, p.id()),
        None => (0, L1BlockId::zero()),
    };
    for (i, diff) in difficulties.iter().enumerate() {
        let header = L1BlockHeader {
            height,
            parent: parent_id,
            receipts_root: receipts_root(&[]),
            difficulty: *diff,
            timestamp: base_timestamp + i as u64,
        };
        parent_id = header.id();
        height += 1;
        out.push(L1BlockBundle::new(header, vec![]));
    }
    out
}

/// An L1 block bundle carrying the given receipts on top of a parent.
pub fn l1_block_with_receipts(parent: &L1BlockHeader, receipts: Vec<Receipt>) -> L1BlockBundle {
    let header = L1BlockHeader {
        height: parent.height + 1,
        parent: parent.id(),
        receipts_root: receipts_root(&receipts),
        difficulty: 1,
        timestamp: parent.timestamp + 1,
    };
    L1BlockBundle::new(header, receipts)
}
