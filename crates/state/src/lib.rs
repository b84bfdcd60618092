//! Chain data structures: L1 views, L2 batches, rollups, transactions,
//! receipts, and the account state snapshots they execute over.

pub mod batch;
pub mod id;
pub mod l1;
pub mod msg;
pub mod receipt;
pub mod rollup;
pub mod snapshot;
pub mod tx;

pub mod prelude;
