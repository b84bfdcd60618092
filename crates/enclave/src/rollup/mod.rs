//! Rollup production and consumption.

pub mod consumer;
pub mod producer;

pub use consumer::RollupConsumer;
pub use producer::RollupProducer;

use velum_primitives::{buf::Buf32, hash};

/// Topic of a rollup-added event on the management contract.
pub fn rollup_added_topic() -> Buf32 {
    hash::raw(b"RollupAdded(bytes32,bytes)")
}
