//! The enclave's long-lived identity keypair.

use rand::rngs::OsRng;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use velum_primitives::buf::{Buf20, Buf32, Buf64};

use crate::{sig, CryptoError, CryptoResult};

/// ECDSA keypair identifying this enclave for its whole lifetime.  The
/// public key doubles as the enclave's network identity.
pub struct EnclaveKey {
    sk: SecretKey,
    pk: PublicKey,
}

impl EnclaveKey {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(&mut OsRng);
        let pk = PublicKey::from_secret_key(&secp, &sk);
        Self { sk, pk }
    }

    pub fn from_secret_bytes(raw: &Buf32) -> CryptoResult<Self> {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(raw.as_slice()).map_err(|_| CryptoError::InvalidSecretKey)?;
        let pk = PublicKey::from_secret_key(&secp, &sk);
        Ok(Self { sk, pk })
    }

    pub fn secret_bytes(&self) -> Buf32 {
        Buf32::from(self.sk.secret_bytes())
    }

    /// Compressed SEC1 encoding of the public key, the form shipped in
    /// attestation reports.
    pub fn public_bytes(&self) -> [u8; 33] {
        self.pk.serialize()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.pk
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.sk
    }

    /// The enclave's address-form identity.
    pub fn enclave_id(&self) -> Buf20 {
        sig::address_from_pubkey(&self.pk)
    }

    pub fn sign(&self, msg: &Buf32) -> (Buf64, u8) {
        sig::sign_recoverable(msg, &self.sk)
    }
}

impl std::fmt::Debug for EnclaveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the secret half
        write!(f, "EnclaveKey({:?})", self.enclave_id())
    }
}

#[cfg(test)]
mod tests {
    use velum_primitives::buf::Buf32;

    use super::EnclaveKey;

    #[test]
    fn test_key_persist_roundtrip() {
        let key = EnclaveKey::generate();
        let restored = EnclaveKey::from_secret_bytes(&key.secret_bytes()).unwrap();
        assert_eq!(key.enclave_id(), restored.enclave_id());
        assert_eq!(key.public_bytes(), restored.public_bytes());
    }

    #[test]
    fn test_sign_binds_identity() {
        let key = EnclaveKey::generate();
        let msg = Buf32::from([7u8; 32]);
        let (sig, rec) = key.sign(&msg);
        let signer = crate::sig::recover_signer(&msg, &sig, rec).unwrap();
        assert_eq!(signer, key.enclave_id());
    }
}
