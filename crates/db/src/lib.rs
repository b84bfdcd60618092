//! Abstract persistence contract the enclave consumes.  The concrete
//! backend lives with the host build; the in-memory stubs here back the
//! test suites.

pub mod errors;
pub mod stubs;
pub mod traits;
pub mod types;

pub type DbResult<T> = Result<T, errors::DbError>;
