//! Storage manager layer: thread-pool backed shims plus read caches over
//! the abstract database traits.

mod cache;
mod exec;
mod managers;
pub mod ops;

use std::sync::Arc;

pub use exec::DbRecv;
pub use managers::{
    batch::BatchManager, l1::L1BlockManager, rollup::RollupManager, secret::SecretManager,
    snapshot::SnapshotManager,
};
use velum_db::traits::Database;

/// A consolidation of database managers.
#[derive(Clone)]
pub struct NodeStorage {
    l1_block_manager: Arc<L1BlockManager>,
    batch_manager: Arc<BatchManager>,
    snapshot_manager: Arc<SnapshotManager>,
    secret_manager: Arc<SecretManager>,
    rollup_manager: Arc<RollupManager>,
}

impl NodeStorage {
    pub fn l1(&self) -> &Arc<L1BlockManager> {
        &self.l1_block_manager
    }

    pub fn batch(&self) -> &Arc<BatchManager> {
        &self.batch_manager
    }

    pub fn snapshot(&self) -> &Arc<SnapshotManager> {
        &self.snapshot_manager
    }

    pub fn secret(&self) -> &Arc<SecretManager> {
        &self.secret_manager
    }

    pub fn rollup(&self) -> &Arc<RollupManager> {
        &self.rollup_manager
    }
}

pub fn create_node_storage<D>(db: Arc<D>, pool: threadpool::ThreadPool) -> NodeStorage
where
    D: Database + Sync + Send + 'static,
{
    let l1_block_manager = Arc::new(L1BlockManager::new(pool.clone(), db.l1_db().clone()));
    let batch_manager = Arc::new(BatchManager::new(pool.clone(), db.batch_db().clone()));
    let snapshot_manager = Arc::new(SnapshotManager::new(pool.clone(), db.snapshot_db().clone()));
    let secret_manager = Arc::new(SecretManager::new(pool.clone(), db.secret_db().clone()));
    let rollup_manager = Arc::new(RollupManager::new(pool.clone(), db.rollup_db().clone()));

    NodeStorage {
        l1_block_manager,
        batch_manager,
        snapshot_manager,
        secret_manager,
        rollup_manager,
    }
}
