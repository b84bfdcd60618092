//! Gas-price-ordered pool of pending user transactions.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use tracing::*;
use velum_crypto::sig;
use velum_state::prelude::*;

use crate::errors::{Error, Result};

/// Higher gas price first, then arrival order.
type PoolKey = (Reverse<u64>, u64);

#[derive(Default)]
struct PoolInner {
    by_priority: BTreeMap<PoolKey, Transaction>,
    keys: HashMap<TxId, PoolKey>,
    arrivals: u64,
}

pub struct Mempool {
    inner: Mutex<PoolInner>,
    min_gas_price: u64,
}

impl Mempool {
    pub fn new(min_gas_price: u64) -> Self {
        Self {
            inner: Mutex::new(PoolInner::default()),
            min_gas_price,
        }
    }

    /// Admits a transaction after static checks.  Stateful checks (nonce,
    /// balance) happen at execution.
    pub fn submit(&self, tx: Transaction) -> Result<TxId> {
        if tx.gas_price < self.min_gas_price {
            return Err(Error::MempoolReject(format!(
                "gas price {} below minimum {}",
                tx.gas_price, self.min_gas_price
            )));
        }

        match sig::recover_signer(&tx.sighash(), &tx.signature, tx.sig_recovery) {
            Ok(signer) if signer == tx.from => {}
            _ => return Err(Error::MempoolReject("signature does not match sender".into())),
        }

        let id = tx.id();
        let mut pool = self.inner.lock();
        if pool.keys.contains_key(&id) {
            return Err(Error::MempoolReject("transaction already known".into()));
        }
        let key = (Reverse(tx.gas_price), pool.arrivals);
        pool.arrivals += 1;
        pool.keys.insert(id, key);
        pool.by_priority.insert(key, tx);
        trace!(tx = %id, "admitted to mempool");
        Ok(id)
    }

    /// Best transactions that fit the byte and gas budgets, in price
    /// order.  Non-fitting transactions are skipped, not evicted; the pool
    /// is only pruned once a batch commits.
    pub fn take_for_batch(&self, max_bytes: usize, gas_budget: u64) -> Vec<Transaction> {
        let pool = self.inner.lock();
        let mut out = Vec::new();
        let mut bytes_left = max_bytes;
        let mut gas_left = gas_budget;
        for tx in pool.by_priority.values() {
            let size = tx.size();
            if size > bytes_left || tx.gas_limit > gas_left {
                continue;
            }
            bytes_left -= size;
            gas_left -= tx.gas_limit;
            out.push(tx.clone());
        }
        out
    }

    /// Drops transactions that made it into a committed batch.
    pub fn remove(&self, ids: &[TxId]) {
        let mut pool = self.inner.lock();
        for id in ids {
            if let Some(key) = pool.keys.remove(id) {
                pool.by_priority.remove(&key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use velum_primitives::buf::Buf20;
    use velum_test_utils::TestAccount;

    use crate::errors::Error;

    use super::Mempool;

    #[test]
    fn test_price_ordering() {
        let pool = Mempool::new(1);
        let acct = TestAccount::generate();

        let mut cheap = acct.signed_transfer(Buf20::zero(), 1, 0);
        cheap.gas_price = 2;
        let (sig, rec) = velum_crypto::sig::sign_recoverable(&cheap.sighash(), &acct.sk);
        cheap.signature = sig;
        cheap.sig_recovery = rec;

        let rich = acct.signed_transfer(Buf20::zero(), 2, 1); // price 10

        pool.submit(cheap.clone()).unwrap();
        pool.submit(rich.clone()).unwrap();

        let taken = pool.take_for_batch(usize::MAX, u64::MAX);
        assert_eq!(taken, vec![rich, cheap]);
    }

    #[test]
    fn test_admission_checks() {
        let pool = Mempool::new(5);
        let acct = TestAccount::generate();

        let mut cheap = acct.signed_transfer(Buf20::zero(), 1, 0);
        cheap.gas_price = 1;
        assert!(matches!(
            pool.submit(cheap),
            Err(Error::MempoolReject(_))
        ));

        let mut forged = acct.signed_transfer(Buf20::zero(), 1, 0);
        forged.from = Buf20::from([9; 20]);
        assert!(matches!(
            pool.submit(forged),
            Err(Error::MempoolReject(_))
        ));

        let good = acct.signed_transfer(Buf20::zero(), 1, 0);
        let id = pool.submit(good.clone()).unwrap();
        // duplicates refused
        assert!(pool.submit(good).is_err());

        pool.remove(&[id]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_budget_skips_but_keeps_scanning() {
        let pool = Mempool::new(1);
        let acct = TestAccount::generate();

        let mut big = acct.signed_transfer(Buf20::zero(), 1, 0);
        big.gas_limit = 90;
        big.gas_price = 100;
        let (sig, rec) = velum_crypto::sig::sign_recoverable(&big.sighash(), &acct.sk);
        big.signature = sig;
        big.sig_recovery = rec;

        let mut small = acct.signed_transfer(Buf20::zero(), 1, 1);
        small.gas_limit = 10;
        small.gas_price = 1;
        let (sig, rec) = velum_crypto::sig::sign_recoverable(&small.sighash(), &acct.sk);
        small.signature = sig;
        small.sig_recovery = rec;

        pool.submit(big).unwrap();
        pool.submit(small.clone()).unwrap();

        // only 50 gas available: the expensive tx doesn't fit, the small
        // one still gets picked up
        let taken = pool.take_for_batch(usize::MAX, 50);
        assert_eq!(taken, vec![small]);
    }
}
