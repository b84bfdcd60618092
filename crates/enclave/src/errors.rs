//! Error taxonomy of the enclave core.
//!
//! [`Error`] is the internal working type.  The façade never leaks it
//! directly; every public operation converts to a [`SystemError`], which
//! carries one of the four outward codes.

use thiserror::Error;
use velum_common::compression::CompressionError;
use velum_crypto::CryptoError;
use velum_db::errors::DbError;
use velum_state::prelude::*;

use crate::attestation::AttestationError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("L1 block {0} already processed")]
    AlreadyProcessed(L1BlockId),

    #[error("ancestor of L1 block {0} not found")]
    AncestorNotFound(L1BlockId),

    #[error("L1 block {0} receipts do not match header root")]
    ReceiptsMismatch(L1BlockId),

    #[error("no canonical L1 head yet")]
    NoL1Head,

    #[error("duplicate rollup {0}")]
    DuplicateRollup(RollupId),

    #[error("no batch fits the rollup size limit")]
    RollupOversize,

    #[error("no stored batch at seq {0}")]
    MissingBatchSeq(u64),

    #[error("could not find parent batch for seq {0}")]
    MissingParentBatch(u64),

    #[error("missing batch {0}")]
    MissingBatch(BatchId),

    #[error("missing state snapshot for batch {0}")]
    MissingSnapshot(BatchId),

    #[error("sequencer signature on batch {0} does not verify")]
    InvalidSequencerSignature(BatchId),

    #[error("state divergence replaying batch {batch} at seq {seq}")]
    StateDivergence { batch: BatchId, seq: u64 },

    #[error("batch gas budget exceeded during replay")]
    GasBudgetExceeded,

    #[error("enclave not initialised yet")]
    NotInitialised,

    #[error("requester not authorized for this data")]
    Unauthorized,

    #[error("entity not found")]
    NotFound,

    #[error("mempool rejected transaction: {0}")]
    MempoolReject(String),

    #[error("debug namespace not enabled")]
    DebugDisabled,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("codec: {0}")]
    Codec(String),

    #[error("genesis: {0}")]
    Genesis(String),

    #[error("attestation: {0}")]
    Attestation(#[from] AttestationError),

    #[error("db: {0}")]
    Db(#[from] DbError),

    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    #[error("compression: {0}")]
    Compression(#[from] CompressionError),
}

impl Error {
    /// Expected conditions: informational for the ingestion pipeline, not
    /// failures.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Error::AlreadyProcessed(_)
                | Error::AncestorNotFound(_)
                | Error::DuplicateRollup(_)
                | Error::NotFound
        )
    }

    fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::DuplicateRollup(_)
                | Error::RollupOversize
                | Error::MissingParentBatch(_)
                | Error::NotInitialised
                | Error::Unauthorized
                | Error::NotFound
                | Error::MempoolReject(_)
                | Error::DebugDisabled
                | Error::InvalidRequest(_)
        )
    }
}

/// Outward-facing error codes of the façade.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SystemErrorKind {
    Unavailable,
    Internal,
    BlockReject,
    UserFacing,
}

/// The error envelope every façade operation returns on failure.
#[derive(Debug)]
pub struct SystemError {
    pub kind: SystemErrorKind,
    pub message: String,
    /// Current L1 head, attached to `BlockReject` so the host can
    /// resynchronise.
    pub l1_head: Option<L1BlockId>,
}

impl SystemError {
    pub fn unavailable(op: &str) -> Self {
        Self {
            kind: SystemErrorKind::Unavailable,
            message: format!("requested {op} with the enclave unavailable"),
            l1_head: None,
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self {
            kind: SystemErrorKind::Internal,
            message: err.to_string(),
            l1_head: None,
        }
    }

    pub fn user(err: impl std::fmt::Display) -> Self {
        Self {
            kind: SystemErrorKind::UserFacing,
            message: err.to_string(),
            l1_head: None,
        }
    }

    pub fn block_reject(l1_head: Option<L1BlockId>, cause: impl std::fmt::Display) -> Self {
        Self {
            kind: SystemErrorKind::BlockReject,
            message: format!("could not ingest L1 block: {cause}"),
            l1_head,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind == SystemErrorKind::Unavailable
    }
}

impl std::fmt::Display for SystemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for SystemError {}

impl From<Error> for SystemError {
    fn from(err: Error) -> Self {
        match &err {
            Error::Crypto(CryptoError::NoKey) | Error::NotInitialised => Self {
                kind: SystemErrorKind::Unavailable,
                message: err.to_string(),
                l1_head: None,
            },
            e if e.is_user_facing() => Self::user(err),
            _ => Self::internal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use velum_state::prelude::*;

    use super::{Error, SystemError, SystemErrorKind};

    #[test]
    fn test_expected_kinds() {
        assert!(Error::AlreadyProcessed(L1BlockId::zero()).is_expected());
        assert!(Error::DuplicateRollup(RollupId::zero()).is_expected());
        assert!(!Error::NoL1Head.is_expected());
    }

    #[test]
    fn test_classification() {
        let sys: SystemError = Error::Unauthorized.into();
        assert_eq!(sys.kind, SystemErrorKind::UserFacing);

        let sys: SystemError = Error::NotInitialised.into();
        assert_eq!(sys.kind, SystemErrorKind::Unavailable);

        let sys: SystemError = Error::StateDivergence {
            batch: BatchId::zero(),
            seq: 4,
        }
        .into();
        assert_eq!(sys.kind, SystemErrorKind::Internal);
    }
}
