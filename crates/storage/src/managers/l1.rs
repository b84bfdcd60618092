use std::num::NonZeroUsize;
use std::sync::Arc;

use threadpool::ThreadPool;
use velum_db::{traits::L1Database, DbResult};
use velum_state::prelude::*;

use crate::{cache, ops};

/// Caching interface over the L1 block store.
pub struct L1BlockManager {
    ops: ops::l1::L1DataOps,
    block_cache: cache::CacheTable<L1BlockId, Option<L1BlockBundle>>,
}

impl L1BlockManager {
    pub fn new<D: L1Database + Sync + Send + 'static>(pool: ThreadPool, db: Arc<D>) -> Self {
        let ops = ops::l1::L1DataOps::new(pool, db);
        let block_cache = cache::CacheTable::new(NonZeroUsize::new(64).unwrap());
        Self { ops, block_cache }
    }

    pub fn put_block_blocking(&self, bundle: L1BlockBundle) -> DbResult<()> {
        let id = bundle.id();
        self.ops.put_block_blocking(bundle)?;
        self.block_cache.purge_blocking(&id);
        Ok(())
    }

    pub async fn put_block_async(&self, bundle: L1BlockBundle) -> DbResult<()> {
        let id = bundle.id();
        self.ops.put_block_async(bundle).await?;
        self.block_cache.purge_async(&id).await;
        Ok(())
    }

    pub fn get_block_blocking(&self, id: &L1BlockId) -> DbResult<Option<L1BlockBundle>> {
        self.block_cache
            .get_or_fetch_blocking(id, || self.ops.get_block_blocking(*id))
    }

    pub async fn get_block_async(&self, id: &L1BlockId) -> DbResult<Option<L1BlockBundle>> {
        self.block_cache
            .get_or_fetch_async(id, || self.ops.get_block_chan(*id))
            .await
    }

    pub fn set_canonical_tip_blocking(&self, id: L1BlockId) -> DbResult<()> {
        self.ops.set_canonical_tip_blocking(id)
    }

    pub fn get_canonical_tip_blocking(&self) -> DbResult<Option<L1BlockId>> {
        self.ops.get_canonical_tip_blocking()
    }
}
