use std::collections::HashMap;

use parking_lot::Mutex;
use velum_state::prelude::*;

use crate::{traits::RollupDatabase, DbResult};

#[derive(Default)]
pub struct StubRollupDb {
    rollups: Mutex<HashMap<RollupId, SignedRollupHeader>>,
}

impl StubRollupDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RollupDatabase for StubRollupDb {
    fn put_rollup(&self, header: SignedRollupHeader) -> DbResult<()> {
        let mut tbl = self.rollups.lock();
        tbl.insert(header.id(), header);
        Ok(())
    }

    fn get_rollup(&self, id: RollupId) -> DbResult<Option<SignedRollupHeader>> {
        let tbl = self.rollups.lock();
        Ok(tbl.get(&id).cloned())
    }
}
