pub use crate::buf::{Buf20, Buf32, Buf64};
pub use crate::hash;
pub use crate::params::{EnclaveParams, NodeKind};
