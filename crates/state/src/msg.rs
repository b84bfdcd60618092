//! Cross-chain messages and the secret-exchange wire structures.

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use velum_primitives::buf::Buf20;

/// A message published on the L1 message bus, destined for the L2 (or the
/// reverse).  Scraped out of L1 receipts by the cross-chain processors and
/// included in the next batch the sequencer mints.
#[derive(
    Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct CrossChainMessage {
    pub sender: Buf20,

    /// Bus-assigned sequence number, unique per sender.
    pub sequence: u64,

    pub payload: Vec<u8>,
}

/// An attestation report as carried in secret-request events.  The
/// `evidence` blob is opaque to everything except the attestation
/// provider that produced it.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Serialize, Deserialize)]
pub struct AttestationReport {
    /// Compressed secp256k1 public key of the requesting enclave.
    pub public_key: Vec<u8>,

    /// Identity of the host the requesting enclave is attached to.
    pub host_id: Buf20,

    /// Network address of that host.
    pub host_address: String,

    /// Provider-specific proof over the fields above.
    pub evidence: Vec<u8>,
}

/// Produced when a verified peer requested the shared secret: the secret,
/// sealed to the peer's reported public key.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProducedSecretResponse {
    /// Enclave id of the requester, derived from the attested key.
    pub requester_id: Buf20,

    /// Host the response should be routed to.
    pub host_address: String,

    /// Sealed secret envelope only the requester can open.
    pub envelope: Vec<u8>,
}
