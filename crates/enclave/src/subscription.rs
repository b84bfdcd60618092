//! Log-filter subscriptions, matched against each executed head batch.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::*;
use velum_state::prelude::*;

/// Host-assigned subscription identity.
pub type SubscriptionId = String;

#[derive(Default)]
pub struct SubscriptionManager {
    subs: RwLock<HashMap<SubscriptionId, LogFilter>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a subscription.
    pub fn add_subscription(&self, id: SubscriptionId, filter: LogFilter) {
        debug!(%id, "added log subscription");
        self.subs.write().insert(id, filter);
    }

    /// Removal is idempotent; racing with an in-flight emit may deliver
    /// one final event, which is acceptable.
    pub fn remove_subscription(&self, id: &SubscriptionId) {
        self.subs.write().remove(id);
    }

    pub fn subscription_count(&self) -> usize {
        self.subs.read().len()
    }

    /// Logs from `receipts` matched by any live subscription, in receipt
    /// order, deduplicated across overlapping subscriptions.
    pub fn logs_for_batch(&self, batch: &Batch, receipts: &[Receipt]) -> Vec<Log> {
        let subs = self.subs.read();
        if subs.is_empty() {
            return Vec::new();
        }
        let height = batch.header().height;
        let mut out = Vec::new();
        for receipt in receipts {
            for log in &receipt.logs {
                let matched = subs.values().any(|filter| {
                    filter.from_batch.map(|from| height >= from).unwrap_or(true)
                        && filter.matches(log)
                });
                if matched {
                    out.push(log.clone());
                }
            }
        }
        out
    }
}
