//! View of the L1 chain as delivered by the host.

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use velum_primitives::{buf::Buf32, hash};

use crate::{
    id::L1BlockId,
    receipt::{receipts_root, Receipt},
};

/// Header of an L1 block.  Only the fields the enclave cares about; the
/// host is responsible for having checked the block against L1 consensus.
#[derive(
    Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct L1BlockHeader {
    pub height: u64,
    pub parent: L1BlockId,
    pub receipts_root: Buf32,
    /// Weight contribution of this block for the most-work head rule.
    pub difficulty: u64,
    pub timestamp: u64,
}

impl L1BlockHeader {
    pub fn id(&self) -> L1BlockId {
        L1BlockId::from(hash::compute_borsh_hash(self))
    }
}

/// An L1 block header along with the receipts of its transactions, as
/// submitted through `SubmitL1Block`.
#[derive(
    Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct L1BlockBundle {
    header: L1BlockHeader,
    receipts: Vec<Receipt>,
}

impl L1BlockBundle {
    pub fn new(header: L1BlockHeader, receipts: Vec<Receipt>) -> Self {
        Self { header, receipts }
    }

    pub fn header(&self) -> &L1BlockHeader {
        &self.header
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    pub fn id(&self) -> L1BlockId {
        self.header.id()
    }

    /// Checks that the receipts list matches the header commitment.
    pub fn check_receipts_root(&self) -> bool {
        receipts_root(&self.receipts) == self.header.receipts_root
    }
}

/// Result of ingesting one L1 block.
#[derive(Clone, Debug)]
pub struct BlockIngestion {
    pub block: L1BlockId,
    /// Whether the block became the canonical head.
    pub new_head: bool,
    pub fork: Option<ChainFork>,
}

impl BlockIngestion {
    pub fn is_fork(&self) -> bool {
        self.fork.is_some()
    }
}

/// Describes a canonical-chain switch: the path abandoned and the path
/// adopted, both walking away from the common ancestor, oldest first.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainFork {
    pub common_ancestor: L1BlockId,
    pub abandoned: Vec<L1BlockId>,
    pub adopted: Vec<L1BlockId>,
}

#[cfg(test)]
mod tests {
    use velum_primitives::buf::Buf32;

    use crate::{
        id::{L1BlockId, TxId},
        receipt::{receipts_root, Receipt},
    };

    use super::{L1BlockBundle, L1BlockHeader};

    #[test]
    fn test_receipts_root_check() {
        let receipts = vec![Receipt {
            tx: TxId::zero(),
            success: true,
            gas_used: 21_000,
            contract_address: None,
            logs: vec![],
        }];
        let header = L1BlockHeader {
            height: 5,
            parent: L1BlockId::zero(),
            receipts_root: receipts_root(&receipts),
            difficulty: 1,
            timestamp: 1_700_000_000,
        };
        assert!(L1BlockBundle::new(header.clone(), receipts).check_receipts_root());

        let bad = L1BlockBundle::new(
            L1BlockHeader {
                receipts_root: Buf32::zero(),
                ..header
            },
            vec![],
        );
        assert!(!bad.check_receipts_root());
    }
}
