//! Trait definitions for low level database interfaces.  Operations are
//! NOT VALIDATED at this level; all access goes through the storage
//! managers.

use std::sync::Arc;

use velum_primitives::buf::Buf32;
use velum_state::prelude::*;

use crate::{
    types::{BatchRecord, PublicTxEntry},
    DbResult,
};

/// Common database interface we parameterize the storage layer over.
pub trait Database {
    type L1DB: L1Database + Send + Sync;
    type BatchDB: BatchDatabase + Send + Sync;
    type SnapshotDB: SnapshotDatabase + Send + Sync;
    type SecretDB: SecretDatabase + Send + Sync;
    type RollupDB: RollupDatabase + Send + Sync;

    fn l1_db(&self) -> &Arc<Self::L1DB>;
    fn batch_db(&self) -> &Arc<Self::BatchDB>;
    fn snapshot_db(&self) -> &Arc<Self::SnapshotDB>;
    fn secret_db(&self) -> &Arc<Self::SecretDB>;
    fn rollup_db(&self) -> &Arc<Self::RollupDB>;
}

/// Store for L1 blocks the host has submitted.  Canonicity is decided by
/// the block processor; this only remembers its last verdict.
pub trait L1Database {
    /// Stores a block bundle keyed by its header hash.  Re-storing the
    /// same block is a no-op.
    fn put_block(&self, bundle: L1BlockBundle) -> DbResult<()>;

    fn get_block(&self, id: L1BlockId) -> DbResult<Option<L1BlockBundle>>;

    fn set_canonical_tip(&self, id: L1BlockId) -> DbResult<()>;

    fn get_canonical_tip(&self) -> DbResult<Option<L1BlockId>>;
}

/// Store for L2 batches and their execution artifacts.
pub trait BatchDatabase {
    /// Stores a batch record.  Does not advance any head pointer.
    fn put_batch(&self, record: BatchRecord) -> DbResult<()>;

    fn get_batch(&self, id: BatchId) -> DbResult<Option<BatchRecord>>;

    fn get_batch_by_seq(&self, seq: u64) -> DbResult<Option<BatchRecord>>;

    /// Highest sequencer number stored, executed or not.
    fn get_current_seq(&self) -> DbResult<Option<u64>>;

    /// Records the receipts of an executed batch and indexes its
    /// transactions for lookup.
    fn put_execution(&self, id: BatchId, receipts: Vec<Receipt>) -> DbResult<()>;

    fn set_executed_head(&self, id: BatchId) -> DbResult<()>;

    fn get_executed_head(&self) -> DbResult<Option<BatchId>>;

    /// Batch a transaction was included in, if any.
    fn get_tx_batch(&self, tx: TxId) -> DbResult<Option<BatchId>>;

    fn count_executed_txs(&self) -> DbResult<u64>;

    /// Executed transactions, newest first.
    fn get_tx_page(&self, offset: u64, limit: u64) -> DbResult<Vec<PublicTxEntry>>;

    /// Number of created contract accounts across all executed batches.
    fn count_contracts(&self) -> DbResult<u64>;
}

/// Cache of post-execution state snapshots, keyed by batch id.  Fully
/// rebuildable by replaying batches, hence the purge escape hatch.
pub trait SnapshotDatabase {
    fn put_snapshot(&self, id: BatchId, snapshot: StateSnapshot) -> DbResult<()>;

    fn get_snapshot(&self, id: BatchId) -> DbResult<Option<StateSnapshot>>;

    fn purge_all(&self) -> DbResult<()>;
}

/// Store for the enclave key and the shared network secret, both opaque
/// 32-byte blobs at this level.
pub trait SecretDatabase {
    /// Persists the enclave identity key.  Write-once.
    fn put_enclave_key(&self, key: Buf32) -> DbResult<()>;

    fn get_enclave_key(&self) -> DbResult<Option<Buf32>>;

    /// Persists the shared network secret.  Write-once.
    fn put_shared_secret(&self, secret: Buf32) -> DbResult<()>;

    fn get_shared_secret(&self) -> DbResult<Option<Buf32>>;
}

/// Store for rollup headers we have produced or consumed, used for
/// duplicate detection.
pub trait RollupDatabase {
    fn put_rollup(&self, header: SignedRollupHeader) -> DbResult<()>;

    fn get_rollup(&self, id: RollupId) -> DbResult<Option<SignedRollupHeader>>;
}
