//! Symmetric payload cipher keyed by the shared network secret.  Batch and
//! rollup bodies cross the enclave boundary through this.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{secret::SharedSecret, CryptoError, CryptoResult};

const NONCE_LEN: usize = 24;

/// Encrypts and decrypts payload blobs under the shared secret.  The key
/// slot starts empty and is filled exactly once, when the secret is
/// generated or received; until then every call fails with
/// [`CryptoError::NoKey`].
///
/// Nonces are derived from a caller-supplied context (the batch or rollup
/// identity), which keeps the ciphertext deterministic per payload and
/// must therefore never repeat for distinct plaintexts.
#[derive(Default)]
pub struct DataEncryptionService {
    key: RwLock<Option<Zeroizing<[u8; 32]>>>,
}

impl DataEncryptionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&self, secret: &SharedSecret) {
        *self.key.write() = Some(Zeroizing::new(*secret.as_bytes()));
    }

    pub fn is_ready(&self) -> bool {
        self.key.read().is_some()
    }

    fn derive_nonce(context: &[u8]) -> [u8; NONCE_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(b"velum.payload.nonce");
        hasher.update(context);
        let digest = hasher.finalize();
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&digest[..NONCE_LEN]);
        nonce
    }

    fn cipher(&self) -> CryptoResult<XChaCha20Poly1305> {
        let guard = self.key.read();
        let key = guard.as_ref().ok_or(CryptoError::NoKey)?;
        let bytes: &[u8; 32] = key;
        Ok(XChaCha20Poly1305::new(bytes.into()))
    }

    pub fn encrypt(&self, context: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let nonce = Self::derive_nonce(context);
        self.cipher()?
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::AeadFailed)
    }

    pub fn decrypt(&self, context: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        let nonce = Self::derive_nonce(context);
        self.cipher()?
            .decrypt(XNonce::from_slice(&nonce), ciphertext)
            .map_err(|_| CryptoError::AeadFailed)
    }
}

#[cfg(test)]
mod tests {
    use crate::secret::SharedSecret;
    use crate::CryptoError;

    use super::DataEncryptionService;

    #[test]
    fn test_requires_key() {
        let svc = DataEncryptionService::new();
        assert!(matches!(
            svc.encrypt(b"ctx", b"data"),
            Err(CryptoError::NoKey)
        ));
    }

    #[test]
    fn test_roundtrip_and_determinism() {
        let secret = SharedSecret::generate();
        let svc = DataEncryptionService::new();
        svc.set_key(&secret);

        let ct1 = svc.encrypt(b"batch-1", b"payload").unwrap();
        let ct2 = svc.encrypt(b"batch-1", b"payload").unwrap();
        assert_eq!(ct1, ct2);
        assert_eq!(svc.decrypt(b"batch-1", &ct1).unwrap(), b"payload");

        // same key, different context, different ciphertext
        let ct3 = svc.encrypt(b"batch-2", b"payload").unwrap();
        assert_ne!(ct1, ct3);
    }

    #[test]
    fn test_peers_with_same_secret_agree() {
        let secret = SharedSecret::generate();
        let a = DataEncryptionService::new();
        let b = DataEncryptionService::new();
        a.set_key(&secret);
        b.set_key(&secret);

        let ct = a.encrypt(b"ctx", b"x").unwrap();
        assert_eq!(b.decrypt(b"ctx", &ct).unwrap(), b"x");
    }
}
