//! Services network-secret requests found in L1 blocks.
//!
//! A joining enclave publishes its attestation report through the
//! management contract; any initialised enclave that sees the event
//! verifies the report and answers with the secret sealed to the
//! attested key.

use std::sync::Arc;

use tracing::*;
use velum_primitives::{buf::Buf20, buf::Buf32, hash};
use velum_state::prelude::*;

use crate::{attestation::AttestationProvider, vault::KeyVault};

/// Topic of a secret-request event on the management contract.
pub fn secret_request_topic() -> Buf32 {
    hash::raw(b"NetworkSecretRequested(address,string)")
}

pub struct SharedSecretProcessor {
    attestation: AttestationProvider,
    vault: Arc<KeyVault>,
    management_address: Buf20,
}

impl SharedSecretProcessor {
    pub fn new(
        attestation: AttestationProvider,
        vault: Arc<KeyVault>,
        management_address: Buf20,
    ) -> Self {
        Self {
            attestation,
            vault,
            management_address,
        }
    }

    /// Scans a block for secret requests and produces a sealed response
    /// for every verifiable one.  Unverifiable requests are logged and
    /// skipped; they are hostile or broken peers, not our failure.
    pub fn process_secret_msgs(&self, bundle: &L1BlockBundle) -> Vec<ProducedSecretResponse> {
        if !self.vault.has_secret() {
            return Vec::new();
        }

        let topic = secret_request_topic();
        let mut responses = Vec::new();
        for receipt in bundle.receipts() {
            for log in &receipt.logs {
                if log.address != self.management_address || log.topics.first() != Some(&topic) {
                    continue;
                }
                let report: AttestationReport = match borsh::from_slice(&log.data) {
                    Ok(r) => r,
                    Err(err) => {
                        warn!(%err, "undecodable secret request, skipping");
                        continue;
                    }
                };
                match self.respond(&report) {
                    Ok(resp) => {
                        info!(requester = ?resp.requester_id, "produced secret response");
                        responses.push(resp);
                    }
                    Err(err) => {
                        warn!(%err, host = %report.host_address, "refused secret request");
                    }
                }
            }
        }
        responses
    }

    fn respond(
        &self,
        report: &AttestationReport,
    ) -> crate::errors::Result<ProducedSecretResponse> {
        let (requester_id, pk) = self.attestation.verify(report)?;
        let envelope = self.vault.sealed_secret_for(&pk)?;
        Ok(ProducedSecretResponse {
            requester_id,
            host_address: report.host_address.clone(),
            envelope,
        })
    }
}
