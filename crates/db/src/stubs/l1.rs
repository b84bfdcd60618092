use std::collections::HashMap;

use parking_lot::Mutex;
use velum_state::prelude::*;

use crate::{traits::L1Database, DbResult};

#[derive(Default)]
pub struct StubL1Db {
    blocks: Mutex<HashMap<L1BlockId, L1BlockBundle>>,
    tip: Mutex<Option<L1BlockId>>,
}

impl StubL1Db {
    pub fn new() -> Self {
        Self::default()
    }
}

impl L1Database for StubL1Db {
    fn put_block(&self, bundle: L1BlockBundle) -> DbResult<()> {
        let mut tbl = self.blocks.lock();
        tbl.entry(bundle.id()).or_insert(bundle);
        Ok(())
    }

    fn get_block(&self, id: L1BlockId) -> DbResult<Option<L1BlockBundle>> {
        let tbl = self.blocks.lock();
        Ok(tbl.get(&id).cloned())
    }

    fn set_canonical_tip(&self, id: L1BlockId) -> DbResult<()> {
        *self.tip.lock() = Some(id);
        Ok(())
    }

    fn get_canonical_tip(&self) -> DbResult<Option<L1BlockId>> {
        Ok(*self.tip.lock())
    }
}
