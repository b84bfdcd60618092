//! Scrapes message-bus events out of canonical L1 receipts and stages
//! them for inclusion in the next batch.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::*;
use velum_primitives::{buf::Buf20, buf::Buf32, hash};
use velum_state::prelude::*;
use velum_storage::NodeStorage;

use crate::errors::Result;

/// Topic of a message published on the L1 bus.
pub fn published_message_topic() -> Buf32 {
    hash::raw(b"MessagePublished(address,uint64,bytes)")
}

/// Widens an address into topic form, left-padded with zeros.
pub fn address_topic(addr: &Buf20) -> Buf32 {
    let mut raw = [0u8; 32];
    raw[12..].copy_from_slice(addr.as_slice());
    Buf32::from(raw)
}

pub struct CrossChainProcessors {
    l1_bus_address: Buf20,
    l2_bus_address: Buf20,
    staged: Mutex<VecDeque<CrossChainMessage>>,
}

impl CrossChainProcessors {
    pub fn new(l1_bus_address: Buf20, chain_id: u64) -> Self {
        Self {
            l1_bus_address,
            l2_bus_address: derive_l2_bus_address(&l1_bus_address, chain_id),
            staged: Mutex::new(VecDeque::new()),
        }
    }

    /// The derived address the L2 side of the bus lives at, public
    /// configuration for wallets and tooling.
    pub fn l2_message_bus_address(&self) -> Buf20 {
        self.l2_bus_address
    }

    /// Scans one canonical block's receipts for bus events and stages the
    /// messages, in receipt order.
    pub fn process_block(&self, bundle: &L1BlockBundle) {
        let topic = published_message_topic();
        let mut staged = self.staged.lock();
        for receipt in bundle.receipts() {
            for log in &receipt.logs {
                if log.address != self.l1_bus_address || log.topics.first() != Some(&topic) {
                    continue;
                }
                match borsh::from_slice::<CrossChainMessage>(&log.data) {
                    Ok(msg) => {
                        debug!(sender = ?msg.sender, sequence = msg.sequence, "staged cross-chain message");
                        staged.push_back(msg);
                    }
                    Err(err) => {
                        warn!(%err, block = %bundle.id(), "undecodable message bus event, skipping");
                    }
                }
            }
        }
    }

    /// Rebuilds the staging queue along the adopted chain after a fork.
    /// Messages already consumed by committed batches were anchored by
    /// those batches' L1 proofs and stay consumed.
    pub fn on_fork(&self, fork: &ChainFork, storage: &Arc<NodeStorage>) -> Result<()> {
        self.staged.lock().clear();
        for id in &fork.adopted {
            if let Some(bundle) = storage.l1().get_block_blocking(id)? {
                self.process_block(&bundle);
            }
        }
        Ok(())
    }

    /// Hands every staged message to the sequencer, clearing the stage.
    pub fn drain(&self) -> Vec<CrossChainMessage> {
        self.staged.lock().drain(..).collect()
    }

    pub fn staged_len(&self) -> usize {
        self.staged.lock().len()
    }
}

fn derive_l2_bus_address(l1_bus: &Buf20, chain_id: u64) -> Buf20 {
    let mut buf = Vec::with_capacity(32);
    buf.extend_from_slice(b"velum.l2bus.");
    buf.extend_from_slice(l1_bus.as_slice());
    buf.extend_from_slice(&chain_id.to_be_bytes());
    let digest = hash::raw(&buf);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest.as_slice()[..20]);
    Buf20::from(addr)
}
