//! State snapshot cache operations.

use velum_state::prelude::*;

use crate::exec::*;

inst_db_ops! {
    SnapshotDataOps(velum_db::traits::SnapshotDatabase) {
        put_snapshot(id: BatchId, snapshot: StateSnapshot) -> ();
        get_snapshot(id: BatchId) -> Option<StateSnapshot>;
        purge_all() -> ();
    }
}
