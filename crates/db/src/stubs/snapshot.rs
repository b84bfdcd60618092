use std::collections::HashMap;

use parking_lot::Mutex;
use velum_state::prelude::*;

use crate::{traits::SnapshotDatabase, DbResult};

#[derive(Default)]
pub struct StubSnapshotDb {
    snapshots: Mutex<HashMap<BatchId, StateSnapshot>>,
}

impl StubSnapshotDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotDatabase for StubSnapshotDb {
    fn put_snapshot(&self, id: BatchId, snapshot: StateSnapshot) -> DbResult<()> {
        let mut tbl = self.snapshots.lock();
        tbl.insert(id, snapshot);
        Ok(())
    }

    fn get_snapshot(&self, id: BatchId) -> DbResult<Option<StateSnapshot>> {
        let tbl = self.snapshots.lock();
        Ok(tbl.get(&id).cloned())
    }

    fn purge_all(&self) -> DbResult<()> {
        self.snapshots.lock().clear();
        Ok(())
    }
}
