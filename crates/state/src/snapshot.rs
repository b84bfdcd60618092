//! Post-execution account state, cached per batch.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use velum_primitives::{
    buf::{Buf20, Buf32},
    hash,
};

/// A single account record.
#[derive(
    Clone, Debug, Default, Eq, PartialEq, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct Account {
    pub balance: u128,
    pub nonce: u64,
    /// Immutable code blob for created accounts, empty for externally
    /// owned ones.
    pub code: Vec<u8>,
}

/// Full account state after executing some batch.  Kept deliberately
/// ordered so the borsh encoding, and therefore the state root, is
/// canonical.
#[derive(
    Clone, Debug, Default, Eq, PartialEq, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct StateSnapshot {
    accounts: BTreeMap<Buf20, Account>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, addr: &Buf20) -> Option<&Account> {
        self.accounts.get(addr)
    }

    pub fn account_mut(&mut self, addr: Buf20) -> &mut Account {
        self.accounts.entry(addr).or_default()
    }

    pub fn balance(&self, addr: &Buf20) -> u128 {
        self.accounts.get(addr).map(|a| a.balance).unwrap_or(0)
    }

    pub fn nonce(&self, addr: &Buf20) -> u64 {
        self.accounts.get(addr).map(|a| a.nonce).unwrap_or(0)
    }

    pub fn code(&self, addr: &Buf20) -> &[u8] {
        self.accounts
            .get(addr)
            .map(|a| a.code.as_slice())
            .unwrap_or(&[])
    }

    pub fn contract_count(&self) -> u64 {
        self.accounts.values().filter(|a| !a.code.is_empty()).count() as u64
    }

    /// Canonical commitment to the whole snapshot.
    pub fn state_root(&self) -> Buf32 {
        hash::compute_borsh_hash(self)
    }
}

#[cfg(test)]
mod tests {
    use velum_primitives::buf::Buf20;

    use super::StateSnapshot;

    #[test]
    fn test_state_root_insertion_order_independent() {
        let a = Buf20::from([1; 20]);
        let b = Buf20::from([2; 20]);

        let mut s1 = StateSnapshot::new();
        s1.account_mut(a).balance = 10;
        s1.account_mut(b).balance = 20;

        let mut s2 = StateSnapshot::new();
        s2.account_mut(b).balance = 20;
        s2.account_mut(a).balance = 10;

        assert_eq!(s1.state_root(), s2.state_root());
    }

    #[test]
    fn test_state_root_tracks_content() {
        let a = Buf20::from([1; 20]);
        let mut s = StateSnapshot::new();
        let empty_root = s.state_root();
        s.account_mut(a).balance = 1;
        assert_ne!(empty_root, s.state_root());
    }
}
