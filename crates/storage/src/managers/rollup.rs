use std::sync::Arc;

use threadpool::ThreadPool;
use velum_db::{traits::RollupDatabase, DbResult};
use velum_state::prelude::*;

use crate::ops;

/// Interface over the rollup record store.
pub struct RollupManager {
    ops: ops::rollup::RollupDataOps,
}

impl RollupManager {
    pub fn new<D: RollupDatabase + Sync + Send + 'static>(pool: ThreadPool, db: Arc<D>) -> Self {
        let ops = ops::rollup::RollupDataOps::new(pool, db);
        Self { ops }
    }

    pub fn put_rollup_blocking(&self, header: SignedRollupHeader) -> DbResult<()> {
        self.ops.put_rollup_blocking(header)
    }

    pub fn get_rollup_blocking(&self, id: &RollupId) -> DbResult<Option<SignedRollupHeader>> {
        self.ops.get_rollup_blocking(*id)
    }

    pub fn has_rollup_blocking(&self, id: &RollupId) -> DbResult<bool> {
        Ok(self.get_rollup_blocking(id)?.is_some())
    }
}
