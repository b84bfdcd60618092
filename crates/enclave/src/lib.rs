//! The trusted core of the rollup: everything that sees cleartext user
//! transactions, holds the network secret, or signs the canonical L2
//! state advance.

pub mod attestation;
pub mod codec;
pub mod debug;
pub mod errors;
pub mod exec;
pub mod genesis;
pub mod l1;
pub mod mempool;
pub mod nodetype;
pub mod rollup;
pub mod rpc;
pub mod service;
pub mod subscription;
pub mod vault;

pub use errors::{Error, SystemError};
pub use service::EnclaveService;
