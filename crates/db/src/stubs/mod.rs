//! In-memory implementations of the database traits, enough to run an
//! enclave in tests without a real backend.

mod batch;
mod l1;
mod rollup;
mod secret;
mod snapshot;

use std::sync::Arc;

pub use batch::StubBatchDb;
pub use l1::StubL1Db;
pub use rollup::StubRollupDb;
pub use secret::StubSecretDb;
pub use snapshot::StubSnapshotDb;

use crate::traits::Database;

/// All stub stores bundled behind the [`Database`] aggregate.
#[derive(Default)]
pub struct StubDatabase {
    l1: Arc<StubL1Db>,
    batch: Arc<StubBatchDb>,
    snapshot: Arc<StubSnapshotDb>,
    secret: Arc<StubSecretDb>,
    rollup: Arc<StubRollupDb>,
}

impl StubDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database for StubDatabase {
    type L1DB = StubL1Db;
    type BatchDB = StubBatchDb;
    type SnapshotDB = StubSnapshotDb;
    type SecretDB = StubSecretDb;
    type RollupDB = StubRollupDb;

    fn l1_db(&self) -> &Arc<StubL1Db> {
        &self.l1
    }

    fn batch_db(&self) -> &Arc<StubBatchDb> {
        &self.batch
    }

    fn snapshot_db(&self) -> &Arc<StubSnapshotDb> {
        &self.snapshot
    }

    fn secret_db(&self) -> &Arc<StubSecretDb> {
        &self.secret
    }

    fn rollup_db(&self) -> &Arc<StubRollupDb> {
        &self.rollup
    }
}
