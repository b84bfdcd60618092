//! Genesis state handling: parsing the allocation config and the
//! dedicated commit step seeding the pre-batch-one snapshot.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::*;
use velum_primitives::buf::Buf20;
use velum_state::prelude::*;
use velum_storage::SnapshotManager;

use crate::errors::{Error, Result};

#[derive(Debug, Deserialize)]
struct GenesisAlloc {
    #[serde(default)]
    alloc: BTreeMap<String, u128>,
}

fn parse_address(raw: &str) -> Result<Buf20> {
    let hex_part = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(hex_part).map_err(|e| Error::Genesis(format!("bad address: {e}")))?;
    let arr: [u8; 20] = bytes
        .try_into()
        .map_err(|_| Error::Genesis(format!("bad address length in {raw}")))?;
    Ok(Buf20::from(arr))
}

/// Initial account allocation of the L2 chain.
#[derive(Clone, Debug, Default)]
pub struct Genesis {
    alloc: BTreeMap<Buf20, u128>,
}

impl Genesis {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: GenesisAlloc =
            serde_json::from_str(raw).map_err(|e| Error::Genesis(e.to_string()))?;
        let mut alloc = BTreeMap::new();
        for (addr, balance) in &parsed.alloc {
            alloc.insert(parse_address(addr)?, *balance);
        }
        Ok(Self { alloc })
    }

    pub fn from_config(genesis_json: Option<&str>) -> Result<Self> {
        match genesis_json {
            Some(raw) => Self::from_json(raw),
            None => Ok(Self::empty()),
        }
    }

    /// Builds the pre-genesis state snapshot.
    pub fn build_state(&self) -> StateSnapshot {
        let mut state = StateSnapshot::new();
        for (addr, balance) in &self.alloc {
            state.account_mut(*addr).balance = *balance;
        }
        state
    }

    /// Seeds the snapshot store with the genesis state, keyed under the
    /// zero batch id that batch one points at as its parent.
    pub fn commit_genesis_state(&self, snapshots: &SnapshotManager) -> Result<StateSnapshot> {
        let state = self.build_state();
        info!(accounts = self.alloc.len(), root = %state.state_root(), "committing genesis state");
        snapshots.put_snapshot_blocking(BatchId::zero(), state.clone())?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::Genesis;

    #[test]
    fn test_parse_alloc() {
        let json = r#"{"alloc": {"0x0101010101010101010101010101010101010101": 1000}}"#;
        let genesis = Genesis::from_json(json).unwrap();
        let state = genesis.build_state();
        let addr = velum_primitives::buf::Buf20::from([1; 20]);
        assert_eq!(state.balance(&addr), 1000);
    }

    #[test]
    fn test_empty_genesis() {
        let state = Genesis::empty().build_state();
        assert_eq!(state.contract_count(), 0);
    }

    #[test]
    fn test_bad_json_refused() {
        assert!(Genesis::from_json("not json").is_err());
    }
}
