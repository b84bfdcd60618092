//! ECDSA signing and recovery over our native digest.

use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};
use velum_primitives::buf::{Buf20, Buf32, Buf64};

use crate::{CryptoError, CryptoResult};

/// Derives the 20-byte address of a public key: leading bytes of the hash
/// of its compressed encoding.
pub fn address_from_pubkey(pk: &PublicKey) -> Buf20 {
    let digest = Sha256::digest(pk.serialize());
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[..20]);
    Buf20::from(addr)
}

/// Signs a digest, returning the compact signature and recovery id.
pub fn sign_recoverable(msg: &Buf32, sk: &SecretKey) -> (Buf64, u8) {
    let secp = Secp256k1::new();
    let msg = Message::from_digest_slice(msg.as_ref()).expect("sig: digest is 32 bytes");
    let sig = secp.sign_ecdsa_recoverable(&msg, sk);
    let (rec_id, compact) = sig.serialize_compact();
    (Buf64::from(compact), rec_id.to_i32() as u8)
}

/// Recovers the signer's address from a digest and a recoverable
/// signature.
pub fn recover_signer(msg: &Buf32, sig: &Buf64, rec: u8) -> CryptoResult<Buf20> {
    let secp = Secp256k1::new();
    let msg = Message::from_digest_slice(msg.as_ref()).map_err(|_| CryptoError::InvalidSignature)?;
    let rec_id = RecoveryId::from_i32(rec as i32).map_err(|_| CryptoError::InvalidSignature)?;
    let sig = RecoverableSignature::from_compact(sig.as_slice(), rec_id)
        .map_err(|_| CryptoError::InvalidSignature)?;
    let pk = secp
        .recover_ecdsa(&msg, &sig)
        .map_err(|_| CryptoError::VerificationFailed)?;
    Ok(address_from_pubkey(&pk))
}

/// Checks a recoverable signature against an expected signer address.
pub fn verify_signer(msg: &Buf32, sig: &Buf64, rec: u8, expected: &Buf20) -> CryptoResult<()> {
    let signer = recover_signer(msg, sig, rec)?;
    if signer != *expected {
        return Err(CryptoError::VerificationFailed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;
    use secp256k1::{PublicKey, SecretKey, SECP256K1};
    use velum_primitives::buf::Buf32;

    use super::{address_from_pubkey, recover_signer, sign_recoverable, verify_signer};

    #[test]
    fn test_sign_recover_roundtrip() {
        let sk = SecretKey::new(&mut OsRng);
        let pk = PublicKey::from_secret_key(SECP256K1, &sk);
        let addr = address_from_pubkey(&pk);

        let msg = Buf32::from([3u8; 32]);
        let (sig, rec) = sign_recoverable(&msg, &sk);
        assert_eq!(recover_signer(&msg, &sig, rec).unwrap(), addr);
        assert!(verify_signer(&msg, &sig, rec, &addr).is_ok());

        // a different message recovers a different key
        let other = Buf32::from([4u8; 32]);
        assert!(verify_signer(&other, &sig, rec, &addr).is_err());
    }
}
