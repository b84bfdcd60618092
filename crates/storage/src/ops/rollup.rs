//! Rollup record operations.

use velum_state::prelude::*;

use crate::exec::*;

inst_db_ops! {
    RollupDataOps(velum_db::traits::RollupDatabase) {
        put_rollup(header: SignedRollupHeader) -> ();
        get_rollup(id: RollupId) -> Option<SignedRollupHeader>;
    }
}
