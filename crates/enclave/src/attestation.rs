//! Attestation report production and verification.
//!
//! The hardware provider itself is a black box supplied by the host
//! build; the dummy variant exists for local networks and is refused at
//! startup when the enclave is configured to attest.

use std::sync::Arc;

use secp256k1::PublicKey;
use thiserror::Error;
use velum_crypto::sig;
use velum_primitives::buf::Buf20;
use velum_state::msg::AttestationReport;

#[derive(Debug, Error)]
pub enum AttestationError {
    #[error("report provider failed: {0}")]
    Provider(String),

    #[error("evidence does not cover the reported key")]
    EvidenceMismatch,

    #[error("reported public key is malformed")]
    MalformedKey,
}

/// The black-box hardware report interface: produces evidence over caller
/// data, and checks evidence yielding the data it covers.
pub trait ReportOracle: Send + Sync {
    fn produce(&self, user_data: &[u8]) -> Result<Vec<u8>, AttestationError>;

    fn check(&self, evidence: &[u8]) -> Result<Vec<u8>, AttestationError>;
}

/// How this enclave produces and verifies attestation reports.
#[derive(Clone)]
pub enum AttestationProvider {
    Hardware(Arc<dyn ReportOracle>),
    Dummy,
}

impl AttestationProvider {
    pub fn is_dummy(&self) -> bool {
        matches!(self, AttestationProvider::Dummy)
    }

    /// Produces a report binding this enclave's public key to its host.
    pub fn report(
        &self,
        public_key: &[u8],
        host_id: Buf20,
        host_address: &str,
    ) -> Result<AttestationReport, AttestationError> {
        let evidence = match self {
            AttestationProvider::Hardware(oracle) => oracle.produce(public_key)?,
            AttestationProvider::Dummy => public_key.to_vec(),
        };
        Ok(AttestationReport {
            public_key: public_key.to_vec(),
            host_id,
            host_address: host_address.to_owned(),
            evidence,
        })
    }

    /// Verifies a peer's report, returning the attested identity and key.
    pub fn verify(
        &self,
        report: &AttestationReport,
    ) -> Result<(Buf20, PublicKey), AttestationError> {
        match self {
            AttestationProvider::Hardware(oracle) => {
                let attested = oracle.check(&report.evidence)?;
                if attested != report.public_key {
                    return Err(AttestationError::EvidenceMismatch);
                }
            }
            AttestationProvider::Dummy => {
                // nothing to check beyond well-formedness
            }
        }
        let pk = PublicKey::from_slice(&report.public_key)
            .map_err(|_| AttestationError::MalformedKey)?;
        Ok((sig::address_from_pubkey(&pk), pk))
    }
}

#[cfg(test)]
mod tests {
    use velum_crypto::keys::EnclaveKey;
    use velum_primitives::buf::Buf20;

    use super::AttestationProvider;

    #[test]
    fn test_dummy_roundtrip() {
        let key = EnclaveKey::generate();
        let provider = AttestationProvider::Dummy;
        let report = provider
            .report(&key.public_bytes(), Buf20::zero(), "host:1234")
            .unwrap();
        let (id, pk) = provider.verify(&report).unwrap();
        assert_eq!(id, key.enclave_id());
        assert_eq!(pk.serialize(), key.public_bytes());
    }

    #[test]
    fn test_malformed_key_rejected() {
        let provider = AttestationProvider::Dummy;
        let mut report = provider
            .report(&EnclaveKey::generate().public_bytes(), Buf20::zero(), "h")
            .unwrap();
        report.public_key = vec![0xff; 5];
        assert!(provider.verify(&report).is_err());
    }
}
