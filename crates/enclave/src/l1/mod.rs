//! The L1 ingestion side of the enclave: block ordering and fork
//! handling, cross-chain message scraping, and secret-request servicing.

pub mod crosschain;
pub mod processor;
pub mod secrets;

pub use crosschain::CrossChainProcessors;
pub use processor::L1BlockProcessor;
pub use secrets::SharedSecretProcessor;
