//! Operating parameters for an enclave instance.
//!
//! These are constructed by the host launcher and handed to the enclave
//! service at startup.  Nothing in here changes for the lifetime of the
//! process.

use std::time::Duration;

use serde::Deserialize;

use crate::buf::Buf20;

/// Which role this enclave plays in the network.  There is exactly one
/// sequencer identity; everything else validates.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
pub enum NodeKind {
    Sequencer,
    Validator,
}

/// Full parameter set for an enclave instance.
#[derive(Clone, Debug, Deserialize)]
pub struct EnclaveParams {
    /// Role of this enclave.
    pub node_kind: NodeKind,

    /// Address of the sole identity allowed to sign batches and rollups.
    pub sequencer_id: Buf20,

    /// Chain ID of the rollup network.
    pub chain_id: u64,

    /// Whether this enclave will produce hardware attestation reports.
    /// Dummy attestation is refused at startup when this is set.
    pub will_attest: bool,

    /// Whether incoming L1 blocks get their receipts checked against the
    /// header's receipts root.
    pub validate_l1_blocks: bool,

    /// Genesis account allocation, as a JSON document.  Absent means an
    /// empty genesis state.
    pub genesis_json: Option<String>,

    /// Profiling knob carried over from the host config.  Refused when
    /// attesting.
    pub profiler_enabled: bool,

    /// Enables the debug_* namespace, which may leak execution detail in
    /// cleartext.
    pub debug_namespace_enabled: bool,

    /// Maximum serialized size of a batch body in bytes.
    pub max_batch_size: usize,

    /// Maximum serialized size of a rollup in bytes.
    pub max_rollup_size: usize,

    /// Gas budget for executing a single batch.
    pub batch_gas_limit: u64,

    /// Gas cap for locally-executed calls and estimations.
    pub local_execution_cap: u64,

    /// Minimum gas price for mempool admission.
    pub min_gas_price: u64,

    /// Account credited with transaction fees.
    pub gas_payment_address: Buf20,

    /// Base fee charged per unit of gas.
    pub base_fee: u64,

    /// Address of the message bus contract on the L1.
    pub message_bus_address: Buf20,

    /// Address of the management contract that rollups are published
    /// through on the L1.
    pub management_contract_address: Buf20,

    /// Identity of the host this enclave is attached to.
    pub host_id: Buf20,

    /// Network address of the host, embedded in attestation reports.
    pub host_address: String,

    /// How long the registry tolerates the head batch not advancing before
    /// reporting unhealthy.
    pub batch_production_timeout: Duration,

    /// How stale the canonical L1 head may be before the block processor
    /// reports unhealthy.
    pub l1_staleness_bound: Duration,
}

impl EnclaveParams {
    pub fn is_sequencer(&self) -> bool {
        self.node_kind == NodeKind::Sequencer
    }
}
