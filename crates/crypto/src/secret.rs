//! The 32-byte shared network secret.

use rand::{rngs::OsRng, RngCore};
use velum_primitives::buf::Buf32;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const SECRET_LEN: usize = 32;

/// Network-wide entropy every enclave holds.  Generated once by the
/// genesis enclave, then replicated through sealed envelopes.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SECRET_LEN]);

impl SharedSecret {
    pub fn generate() -> Self {
        let mut raw = [0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut raw);
        Self(raw)
    }

    pub fn from_bytes(raw: [u8; SECRET_LEN]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }

    /// Opaque form for the secret store.
    pub fn to_buf(&self) -> Buf32 {
        Buf32::from(self.0)
    }

    pub fn from_buf(buf: &Buf32) -> Self {
        Self(*buf.as_ref())
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::SharedSecret;

    #[test]
    fn test_generate_distinct() {
        assert_ne!(SharedSecret::generate(), SharedSecret::generate());
    }

    #[test]
    fn test_buf_roundtrip() {
        let secret = SharedSecret::generate();
        assert_eq!(SharedSecret::from_buf(&secret.to_buf()), secret);
    }
}
