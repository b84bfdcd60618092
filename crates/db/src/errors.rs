use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// The requested entity simply isn't there.  Callers that treat
    /// absence as normal match on this variant.
    #[error("entry not found")]
    NotFound,

    #[error("tried to insert {0} with out-of-order seq {1}")]
    OooInsert(&'static str, u64),

    #[error("tried to overwrite immutable {0} entry")]
    Overwrite(&'static str),

    #[error("db worker exited before responding")]
    WorkerFailedStrangely,

    #[error("{0}")]
    Other(String),
}
