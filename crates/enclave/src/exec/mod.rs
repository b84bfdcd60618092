//! Deterministic batch execution and the in-memory registry of executed
//! batches.

pub mod executor;
pub mod registry;

pub use executor::{BatchContext, BatchExecutor, ComputedBatch};
pub use registry::BatchRegistry;
