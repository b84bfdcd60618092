//! The deterministic state-transition function of the rollup.
//!
//! Everything in here must produce identical results on the sequencer and
//! on every validator: no clocks, no randomness, no iteration over
//! unordered collections.

use std::sync::Arc;

use tracing::*;
use velum_primitives::buf::{Buf20, Buf32};
use velum_state::prelude::*;
use velum_storage::NodeStorage;

use crate::{
    errors::{Error, Result},
    genesis::Genesis,
    l1::crosschain::{address_topic, published_message_topic},
};

/// Header fields fixed by the caller before execution.
#[derive(Clone, Debug)]
pub struct BatchContext {
    pub seq_no: u64,
    pub height: u64,
    pub parent: BatchId,
    pub l1_proof: L1BlockId,
    pub timestamp: u64,
}

impl BatchContext {
    pub fn from_header(header: &BatchHeader) -> Self {
        Self {
            seq_no: header.seq_no,
            height: header.height,
            parent: header.parent,
            l1_proof: header.l1_proof,
            timestamp: header.timestamp,
        }
    }
}

/// Everything produced by executing a batch's inputs over its parent
/// state.
pub struct ComputedBatch {
    pub state: StateSnapshot,
    pub included: Vec<Transaction>,
    /// Transactions skipped for exceeding the gas budget, sequencing only.
    pub dropped: Vec<TxId>,
    pub receipts: Vec<Receipt>,
    pub gas_used: u64,
}

impl ComputedBatch {
    pub fn state_root(&self) -> Buf32 {
        self.state.state_root()
    }

    pub fn receipts_root(&self) -> Buf32 {
        receipts_root(&self.receipts)
    }

    pub fn logs_bloom(&self) -> LogsBloom {
        let mut bloom = LogsBloom::zero();
        bloom.accrue_receipts(&self.receipts);
        bloom
    }
}

pub struct BatchExecutor {
    storage: Arc<NodeStorage>,
    genesis: Genesis,
    batch_gas_limit: u64,
    gas_payment_address: Buf20,
    l2_bus_address: Buf20,
}

impl BatchExecutor {
    pub fn new(
        storage: Arc<NodeStorage>,
        genesis: Genesis,
        batch_gas_limit: u64,
        gas_payment_address: Buf20,
        l2_bus_address: Buf20,
    ) -> Self {
        Self {
            storage,
            genesis,
            batch_gas_limit,
            gas_payment_address,
            l2_bus_address,
        }
    }

    /// Fetches the post-state of `parent`, committing the genesis state on
    /// first use when the parent is the zero id.
    pub fn parent_snapshot(&self, parent: &BatchId) -> Result<StateSnapshot> {
        if let Some(snapshot) = self.storage.snapshot().get_snapshot_blocking(parent)? {
            return Ok(snapshot);
        }
        if parent.is_zero() {
            return self.commit_genesis_state();
        }
        Err(Error::MissingSnapshot(*parent))
    }

    /// Dedicated genesis commit step.
    pub fn commit_genesis_state(&self) -> Result<StateSnapshot> {
        self.genesis.commit_genesis_state(self.storage.snapshot())
    }

    /// Executes an ordered transaction list plus cross-chain messages over
    /// the parent state of `ctx`.
    ///
    /// With `drop_overflow`, transactions that would exceed the remaining
    /// gas budget are skipped and reported in `dropped` (the sequencing
    /// rule); without it the same condition is an error (the replay rule,
    /// where the input list is already final).
    pub fn compute_batch(
        &self,
        ctx: &BatchContext,
        txs: &[Transaction],
        msgs: &[CrossChainMessage],
        drop_overflow: bool,
    ) -> Result<ComputedBatch> {
        let mut state = self.parent_snapshot(&ctx.parent)?;
        let mut included = Vec::with_capacity(txs.len());
        let mut dropped = Vec::new();
        let mut receipts = Vec::with_capacity(txs.len() + msgs.len());
        let mut gas_used = 0u64;
        // budget accounting reserves each tx's full gas limit
        let mut gas_reserved = 0u64;

        for tx in txs {
            if gas_reserved.saturating_add(tx.gas_limit) > self.batch_gas_limit {
                if drop_overflow {
                    debug!(tx = %tx.id(), "dropping tx exceeding batch gas budget");
                    dropped.push(tx.id());
                    continue;
                }
                return Err(Error::GasBudgetExceeded);
            }
            let receipt = self.apply_transaction(&mut state, tx);
            gas_used += receipt.gas_used;
            gas_reserved += tx.gas_limit;
            included.push(tx.clone());
            receipts.push(receipt);
        }

        for msg in msgs {
            receipts.push(self.synthetic_message_receipt(msg));
        }

        Ok(ComputedBatch {
            state,
            included,
            dropped,
            receipts,
            gas_used,
        })
    }

    /// Replays a shipped batch exactly as the sequencer ordered it.
    pub fn replay_batch(&self, batch: &Batch) -> Result<ComputedBatch> {
        let ctx = BatchContext::from_header(batch.header());
        self.compute_batch(
            &ctx,
            &batch.body().transactions,
            &batch.body().cross_chain,
            false,
        )
    }

    /// Persists the execution artifacts and advances the executed head.
    pub fn commit_batch(&self, batch: &Batch, computed: &ComputedBatch) -> Result<()> {
        let id = batch.id();
        self.storage
            .snapshot()
            .put_snapshot_blocking(id, computed.state.clone())?;
        self.storage
            .batch()
            .put_execution_blocking(id, computed.receipts.clone())?;
        self.storage.batch().set_executed_head_blocking(id)?;
        Ok(())
    }

    fn apply_transaction(&self, state: &mut StateSnapshot, tx: &Transaction) -> Receipt {
        let gas_used = tx.intrinsic_gas();
        let mut receipt = Receipt {
            tx: tx.id(),
            success: false,
            gas_used,
            contract_address: None,
            logs: vec![],
        };

        // the sender must actually have signed this payload
        match velum_crypto::sig::recover_signer(&tx.sighash(), &tx.signature, tx.sig_recovery) {
            Ok(signer) if signer == tx.from => {}
            _ => return receipt,
        }

        if tx.gas_limit < gas_used {
            return receipt;
        }

        if state.nonce(&tx.from) != tx.nonce {
            return receipt;
        }

        let fee = gas_used as u128 * tx.gas_price as u128;
        let cost = tx.value.saturating_add(fee);
        if state.balance(&tx.from) < cost {
            // the nonce is burned, the funds stay put
            state.account_mut(tx.from).nonce += 1;
            return receipt;
        }

        {
            let sender = state.account_mut(tx.from);
            sender.balance -= cost;
            sender.nonce += 1;
        }

        match &tx.to {
            Some(to) => {
                state.account_mut(*to).balance += tx.value;
            }
            None => {
                let contract = contract_address(&tx.from, tx.nonce);
                let account = state.account_mut(contract);
                account.balance += tx.value;
                account.code = tx.data.clone();
                receipt.contract_address = Some(contract);
            }
        }
        state.account_mut(self.gas_payment_address).balance += fee;

        receipt.success = true;
        receipt
    }

    /// Cross-chain messages surface on the L2 as synthetic bus receipts.
    fn synthetic_message_receipt(&self, msg: &CrossChainMessage) -> Receipt {
        Receipt {
            tx: TxId::from(velum_primitives::hash::compute_borsh_hash(msg)),
            success: true,
            gas_used: 0,
            contract_address: None,
            logs: vec![Log {
                address: self.l2_bus_address,
                topics: vec![published_message_topic(), address_topic(&msg.sender)],
                data: msg.payload.clone(),
            }],
        }
    }
}

/// Address of an account created by (`creator`, `nonce`).
pub fn contract_address(creator: &Buf20, nonce: u64) -> Buf20 {
    let mut buf = Vec::with_capacity(28);
    buf.extend_from_slice(creator.as_slice());
    buf.extend_from_slice(&nonce.to_be_bytes());
    let digest = velum_primitives::hash::raw(&buf);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest.as_slice()[..20]);
    Buf20::from(addr)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use velum_db::stubs::StubDatabase;
    use velum_primitives::buf::Buf20;
    use velum_state::prelude::*;
    use velum_storage::create_node_storage;
    use velum_test_utils::TestAccount;

    use crate::genesis::Genesis;

    use super::{BatchContext, BatchExecutor};

    const GAS_LIMIT: u64 = 100_000;

    fn mkexecutor(funded: &[(Buf20, u128)]) -> BatchExecutor {
        let db = Arc::new(StubDatabase::new());
        let storage = Arc::new(create_node_storage(db, threadpool::ThreadPool::new(1)));
        let alloc: std::collections::BTreeMap<String, u128> = funded
            .iter()
            .map(|(addr, bal)| (format!("0x{}", hex::encode(addr.as_slice())), *bal))
            .collect();
        let json = serde_json::json!({ "alloc": alloc }).to_string();
        let genesis = Genesis::from_json(&json).unwrap();
        BatchExecutor::new(
            storage,
            genesis,
            GAS_LIMIT,
            Buf20::from([0xfe; 20]),
            Buf20::from([0xbb; 20]),
        )
    }

    fn ctx() -> BatchContext {
        BatchContext {
            seq_no: GENESIS_SEQ,
            height: GENESIS_SEQ,
            parent: BatchId::zero(),
            l1_proof: L1BlockId::zero(),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_transfer_moves_value_and_fees() {
        let alice = TestAccount::generate();
        let bob = Buf20::from([7; 20]);
        let executor = mkexecutor(&[(alice.address, 10_000_000)]);

        let tx = alice.signed_transfer(bob, 1_000, 0);
        let fee = tx.intrinsic_gas() as u128 * tx.gas_price as u128;
        let computed = executor.compute_batch(&ctx(), &[tx], &[], true).unwrap();

        assert!(computed.receipts[0].success);
        assert_eq!(computed.state.balance(&bob), 1_000);
        assert_eq!(
            computed.state.balance(&alice.address),
            10_000_000 - 1_000 - fee
        );
        assert_eq!(computed.state.balance(&Buf20::from([0xfe; 20])), fee);
        assert_eq!(computed.state.nonce(&alice.address), 1);
    }

    #[test]
    fn test_determinism() {
        let alice = TestAccount::generate();
        let executor = mkexecutor(&[(alice.address, 10_000_000)]);
        let txs = vec![
            alice.signed_transfer(Buf20::from([7; 20]), 10, 0),
            alice.signed_transfer(Buf20::from([8; 20]), 20, 1),
        ];
        let a = executor.compute_batch(&ctx(), &txs, &[], true).unwrap();
        let b = executor.compute_batch(&ctx(), &txs, &[], true).unwrap();
        assert_eq!(a.state_root(), b.state_root());
        assert_eq!(a.receipts_root(), b.receipts_root());
        assert_eq!(a.gas_used, b.gas_used);
    }

    #[test]
    fn test_bad_nonce_and_bad_sig_fail_cleanly() {
        let alice = TestAccount::generate();
        let executor = mkexecutor(&[(alice.address, 10_000_000)]);

        let wrong_nonce = alice.signed_transfer(Buf20::from([7; 20]), 10, 5);
        let mut forged = alice.signed_transfer(Buf20::from([7; 20]), 10, 0);
        forged.value = 999_999; // breaks the signature

        let computed = executor
            .compute_batch(&ctx(), &[wrong_nonce, forged], &[], true)
            .unwrap();
        assert!(computed.receipts.iter().all(|r| !r.success));
        assert_eq!(computed.state.balance(&Buf20::from([7; 20])), 0);
    }

    #[test]
    fn test_gas_budget_drops_when_sequencing_errors_when_replaying() {
        let alice = TestAccount::generate();
        let executor = mkexecutor(&[(alice.address, u128::MAX / 2)]);

        // each transfer reserves 30k gas, so only 3 fit in 100k
        let txs: Vec<_> = (0..5)
            .map(|i| alice.signed_transfer(Buf20::from([7; 20]), 1, i))
            .collect();

        let computed = executor.compute_batch(&ctx(), &txs, &[], true).unwrap();
        assert_eq!(computed.included.len(), 3);
        assert_eq!(computed.dropped.len(), 2);

        assert!(executor.compute_batch(&ctx(), &txs, &[], false).is_err());
    }

    #[test]
    fn test_contract_creation() {
        let alice = TestAccount::generate();
        let executor = mkexecutor(&[(alice.address, 10_000_000)]);

        let mut tx = alice.signed_transfer(Buf20::zero(), 0, 0);
        tx.to = None;
        tx.data = vec![0x60, 0x60];
        let (sig, rec) = velum_crypto::sig::sign_recoverable(&tx.sighash(), &alice.sk);
        tx.signature = sig;
        tx.sig_recovery = rec;

        let computed = executor.compute_batch(&ctx(), &[tx], &[], true).unwrap();
        let contract = computed.receipts[0].contract_address.expect("created");
        assert_eq!(computed.state.code(&contract), &[0x60, 0x60]);
    }
}
