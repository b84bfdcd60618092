use std::sync::Arc;

use threadpool::ThreadPool;
use velum_db::{traits::SnapshotDatabase, DbResult};
use velum_state::prelude::*;

use crate::ops;

/// Interface over the snapshot store.  Deliberately uncached: the store
/// itself *is* the state cache, and correctness of the replay recovery
/// depends on seeing its real contents.
pub struct SnapshotManager {
    ops: ops::snapshot::SnapshotDataOps,
}

impl SnapshotManager {
    pub fn new<D: SnapshotDatabase + Sync + Send + 'static>(pool: ThreadPool, db: Arc<D>) -> Self {
        let ops = ops::snapshot::SnapshotDataOps::new(pool, db);
        Self { ops }
    }

    pub fn put_snapshot_blocking(&self, id: BatchId, snapshot: StateSnapshot) -> DbResult<()> {
        self.ops.put_snapshot_blocking(id, snapshot)
    }

    pub fn get_snapshot_blocking(&self, id: &BatchId) -> DbResult<Option<StateSnapshot>> {
        self.ops.get_snapshot_blocking(*id)
    }

    pub fn has_snapshot_blocking(&self, id: &BatchId) -> DbResult<bool> {
        Ok(self.get_snapshot_blocking(id)?.is_some())
    }

    pub fn purge_all_blocking(&self) -> DbResult<()> {
        self.ops.purge_all_blocking()
    }
}
