pub use crate::batch::{Batch, BatchBody, BatchHeader, ExtBatch, SignedBatchHeader, GENESIS_SEQ};
pub use crate::id::{BatchId, L1BlockId, RollupId, TxId};
pub use crate::l1::{BlockIngestion, ChainFork, L1BlockBundle, L1BlockHeader};
pub use crate::msg::{AttestationReport, CrossChainMessage, ProducedSecretResponse};
pub use crate::receipt::{receipts_root, Log, LogFilter, LogsBloom, Receipt};
pub use crate::rollup::{ExtRollup, RollupHeader, SignedRollupHeader};
pub use crate::snapshot::{Account, StateSnapshot};
pub use crate::tx::Transaction;
