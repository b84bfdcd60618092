//! In-memory projection of the executed batch chain.

use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::*;
use velum_state::prelude::*;

/// The single executed-batch consumer.  Late subscribers only see events
/// published after they attach.
pub type BatchCallback = Box<dyn Fn(&Batch, &[Receipt]) + Send + Sync>;

pub struct BatchRegistry {
    head_seq: RwLock<Option<u64>>,
    last_advance: Mutex<Instant>,
    production_timeout: Duration,
    subscriber: RwLock<Option<BatchCallback>>,
}

impl BatchRegistry {
    pub fn new(initial_head: Option<u64>, production_timeout: Duration) -> Self {
        Self {
            head_seq: RwLock::new(initial_head),
            last_advance: Mutex::new(Instant::now()),
            production_timeout,
            subscriber: RwLock::new(None),
        }
    }

    /// Seq number of the current executed head, `None` before genesis.
    pub fn head_batch_seq(&self) -> Option<u64> {
        *self.head_seq.read()
    }

    /// Records an executed batch and fans it out to the subscriber.
    /// Publications arrive in sequencer order by construction (they are
    /// made under the ingestion mutex).
    pub fn publish(&self, batch: &Batch, receipts: &[Receipt]) {
        let seq = batch.seq_no();
        {
            let mut head = self.head_seq.write();
            if head.map(|h| seq > h).unwrap_or(true) {
                *head = Some(seq);
                *self.last_advance.lock() = Instant::now();
            }
        }
        debug!(seq, batch = %batch.id(), "publishing executed batch");

        let guard = self.subscriber.read();
        if let Some(cb) = guard.as_ref() {
            cb(batch, receipts);
        }
    }

    /// Attaches the executed-batch consumer, replacing any previous one.
    pub fn subscribe_for_executed_batches(&self, cb: BatchCallback) {
        *self.subscriber.write() = Some(cb);
    }

    pub fn unsubscribe_from_batches(&self) {
        *self.subscriber.write() = None;
    }

    /// Healthy while batches keep arriving; an idle chain that never
    /// started is healthy too.
    pub fn health_check(&self) -> bool {
        if self.head_batch_seq().is_none() {
            return true;
        }
        self.last_advance.lock().elapsed() <= self.production_timeout
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use velum_primitives::buf::{Buf32, Buf64};
    use velum_state::prelude::*;

    use super::BatchRegistry;

    fn mkbatch(seq: u64) -> Batch {
        let header = BatchHeader {
            seq_no: seq,
            height: seq,
            parent: BatchId::zero(),
            l1_proof: L1BlockId::zero(),
            timestamp: 0,
            state_root: Buf32::zero(),
            txs_root: Buf32::zero(),
            receipts_root: Buf32::zero(),
            logs_bloom: LogsBloom::zero(),
            gas_used: 0,
        };
        Batch::new(
            SignedBatchHeader::new(header, Buf64::zero(), 0),
            BatchBody::default(),
        )
    }

    #[test]
    fn test_head_advances_monotonically() {
        let registry = BatchRegistry::new(None, Duration::from_secs(60));
        registry.publish(&mkbatch(1), &[]);
        registry.publish(&mkbatch(2), &[]);
        // stale republication does not move the head back
        registry.publish(&mkbatch(1), &[]);
        assert_eq!(registry.head_batch_seq(), Some(2));
    }

    #[test]
    fn test_single_subscriber_fanout() {
        let registry = BatchRegistry::new(None, Duration::from_secs(60));
        let seen = Arc::new(AtomicU64::new(0));

        let seen_a = seen.clone();
        registry.subscribe_for_executed_batches(Box::new(move |batch, _| {
            seen_a.store(batch.seq_no(), Ordering::SeqCst);
        }));
        registry.publish(&mkbatch(1), &[]);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        registry.unsubscribe_from_batches();
        registry.publish(&mkbatch(2), &[]);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_health() {
        let registry = BatchRegistry::new(None, Duration::from_millis(10));
        assert!(registry.health_check());
        registry.publish(&mkbatch(1), &[]);
        assert!(registry.health_check());
        std::thread::sleep(Duration::from_millis(30));
        assert!(!registry.health_check());
    }
}
