//! L1 block data operations.

use velum_state::prelude::*;

use crate::exec::*;

inst_db_ops! {
    L1DataOps(velum_db::traits::L1Database) {
        put_block(bundle: L1BlockBundle) -> ();
        get_block(id: L1BlockId) -> Option<L1BlockBundle>;
        set_canonical_tip(id: L1BlockId) -> ();
        get_canonical_tip() -> Option<L1BlockId>;
    }
}
