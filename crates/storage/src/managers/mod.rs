pub mod batch;
pub mod l1;
pub mod rollup;
pub mod secret;
pub mod snapshot;
