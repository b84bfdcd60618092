//! Common wrapper around whatever we choose our native hash function to be.

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};

use crate::buf::Buf32;

/// Direct untagged hash.
pub fn raw(buf: &[u8]) -> Buf32 {
    Buf32::from(<[u8; 32]>::from(Sha256::digest(buf)))
}

/// Hashes the borsh serialization of a value without materializing the whole
/// encoding in memory.
pub fn compute_borsh_hash<T: BorshSerialize>(v: &T) -> Buf32 {
    let mut hasher = Sha256::new();
    v.serialize(&mut hasher).expect("hash: borsh serialize");
    let arr: [u8; 32] = hasher.finalize().into();
    Buf32::from(arr)
}
