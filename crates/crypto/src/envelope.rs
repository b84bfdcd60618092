//! Sealed envelopes: asymmetric encryption to a secp256k1 public key via
//! an ephemeral ECDH exchange and an AEAD over the derived key.
//!
//! Used for the shared-secret exchange between enclaves and for the
//! viewing-key RPC envelope.

use borsh::{BorshDeserialize, BorshSerialize};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};
use secp256k1::{ecdh, PublicKey, Secp256k1, SecretKey};

use crate::{CryptoError, CryptoResult};

const NONCE_LEN: usize = 24;

/// Ciphertext addressed to a single secp256k1 public key.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct SealedEnvelope {
    /// Compressed ephemeral public key used for the ECDH exchange.
    ephemeral_pk: [u8; 33],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl SealedEnvelope {
    /// Encrypts `plaintext` so only the holder of the key behind
    /// `recipient` can read it.
    pub fn seal(recipient: &PublicKey, plaintext: &[u8]) -> CryptoResult<Self> {
        let secp = Secp256k1::new();
        let eph_sk = SecretKey::new(&mut OsRng);
        let eph_pk = PublicKey::from_secret_key(&secp, &eph_sk);

        let shared = ecdh::SharedSecret::new(recipient, &eph_sk);
        let key = shared.secret_bytes();
        let cipher = XChaCha20Poly1305::new((&key).into());

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::AeadFailed)?;

        Ok(Self {
            ephemeral_pk: eph_pk.serialize(),
            nonce,
            ciphertext,
        })
    }

    /// Seals to a compressed public key encoding.
    pub fn seal_to_bytes(recipient: &[u8], plaintext: &[u8]) -> CryptoResult<Self> {
        let pk = PublicKey::from_slice(recipient).map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::seal(&pk, plaintext)
    }

    /// Opens the envelope with the recipient's secret key.
    pub fn open(&self, sk: &SecretKey) -> CryptoResult<Vec<u8>> {
        let eph_pk =
            PublicKey::from_slice(&self.ephemeral_pk).map_err(|_| CryptoError::InvalidPublicKey)?;
        let shared = ecdh::SharedSecret::new(&eph_pk, sk);
        let key = shared.secret_bytes();
        let cipher = XChaCha20Poly1305::new((&key).into());
        cipher
            .decrypt(XNonce::from_slice(&self.nonce), self.ciphertext.as_ref())
            .map_err(|_| CryptoError::AeadFailed)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("envelope: serialize")
    }

    pub fn from_bytes(raw: &[u8]) -> CryptoResult<Self> {
        borsh::from_slice(raw).map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))
    }
}
