//! Cryptographic machinery for the enclave: identity keys, signatures,
//! sealed envelopes, and the payload cipher keyed by the shared secret.

pub mod envelope;
pub mod keys;
pub mod payload;
pub mod secret;
pub mod sig;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid secret key material")]
    InvalidSecretKey,

    #[error("invalid public key encoding")]
    InvalidPublicKey,

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("signature did not verify")]
    VerificationFailed,

    #[error("aead failure, wrong key or corrupted ciphertext")]
    AeadFailed,

    #[error("payload cipher has no key yet")]
    NoKey,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
