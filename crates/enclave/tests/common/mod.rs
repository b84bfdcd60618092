//! Shared wiring for the end-to-end scenarios: enclave pairs over stub
//! databases, viewing-key envelopes, and L1 feeding helpers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::OsRng;
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use velum_common::compression::CompressionService;
use velum_crypto::{
    envelope::SealedEnvelope,
    keys::EnclaveKey,
    payload::DataEncryptionService,
    secret::SharedSecret,
    sig,
};
use velum_db::{stubs::StubDatabase, traits::SecretDatabase};
use velum_enclave::{
    codec::PayloadCodec,
    rpc::{viewing_key_digest, RpcRequest},
    service::EnclaveService,
};
use velum_primitives::{
    buf::{Buf20, Buf32},
    params::{EnclaveParams, NodeKind},
};
use velum_state::prelude::*;
use velum_test_utils::{l1_chain_from, TestAccount};

pub const TEST_SECRET: [u8; 32] = [0x5e; 32];

pub fn bus_address() -> Buf20 {
    Buf20::from([0xbb; 20])
}

pub fn management_address() -> Buf20 {
    Buf20::from([0xcc; 20])
}

pub fn mkparams(
    kind: NodeKind,
    sequencer_id: Buf20,
    genesis_json: Option<String>,
) -> EnclaveParams {
    EnclaveParams {
        node_kind: kind,
        sequencer_id,
        chain_id: 778,
        will_attest: false,
        validate_l1_blocks: true,
        genesis_json,
        profiler_enabled: false,
        debug_namespace_enabled: true,
        max_batch_size: 1024 * 1024,
        max_rollup_size: 4 * 1024 * 1024,
        batch_gas_limit: 1_000_000,
        local_execution_cap: 10_000_000,
        min_gas_price: 1,
        gas_payment_address: Buf20::from([0xfe; 20]),
        base_fee: 1,
        message_bus_address: bus_address(),
        management_contract_address: management_address(),
        host_id: Buf20::from([0x05; 20]),
        host_address: "localhost:10000".into(),
        batch_production_timeout: Duration::from_secs(60),
        l1_staleness_bound: Duration::from_secs(3600),
    }
}

pub struct TestEnclave {
    pub svc: EnclaveService,
    pub db: Arc<StubDatabase>,
}

/// Builds a sequencer enclave with a pre-seeded identity key (so tests
/// know the sequencer id upfront) and optionally the shared secret.
pub fn sequencer_setup(
    genesis_json: Option<String>,
    seed_secret: bool,
) -> (TestEnclave, SecretKey) {
    sequencer_setup_with(genesis_json, seed_secret, |_| {})
}

/// Same, with a hook to adjust the parameters before startup.
pub fn sequencer_setup_with(
    genesis_json: Option<String>,
    seed_secret: bool,
    tweak: impl FnOnce(&mut EnclaveParams),
) -> (TestEnclave, SecretKey) {
    let sk = SecretKey::new(&mut OsRng);
    let key = EnclaveKey::from_secret_bytes(&Buf32::from(sk.secret_bytes())).unwrap();
    let sequencer_id = key.enclave_id();

    let db = Arc::new(StubDatabase::new());
    velum_db::traits::Database::secret_db(db.as_ref())
        .put_enclave_key(Buf32::from(sk.secret_bytes()))
        .unwrap();
    if seed_secret {
        velum_db::traits::Database::secret_db(db.as_ref())
            .put_shared_secret(Buf32::from(TEST_SECRET))
            .unwrap();
    }

    let mut params = mkparams(NodeKind::Sequencer, sequencer_id, genesis_json);
    tweak(&mut params);
    let svc = EnclaveService::new(params, db.clone(), None).expect("sequencer init");
    (TestEnclave { svc, db }, sk)
}

/// Builds a validator enclave configured against the given sequencer id.
pub fn validator_setup(
    sequencer_id: Buf20,
    genesis_json: Option<String>,
    seed_secret: bool,
) -> TestEnclave {
    let db = Arc::new(StubDatabase::new());
    if seed_secret {
        velum_db::traits::Database::secret_db(db.as_ref())
            .put_shared_secret(Buf32::from(TEST_SECRET))
            .unwrap();
    }
    let params = mkparams(NodeKind::Validator, sequencer_id, genesis_json);
    let svc = EnclaveService::new(params, db.clone(), None).expect("validator init");
    TestEnclave { svc, db }
}

/// Feeds the same fresh L1 root block to every given enclave, returning
/// its bundle for chaining.
pub fn feed_l1_root(enclaves: &[&TestEnclave]) -> L1BlockBundle {
    let chain = l1_chain_from(None, &[1], 1_700_000_000);
    for enclave in enclaves {
        enclave.svc.submit_l1_block(chain[0].clone()).unwrap();
    }
    chain[0].clone()
}

/// A genesis JSON funding the given accounts.
pub fn genesis_funding(accounts: &[(&TestAccount, u128)]) -> String {
    let alloc: std::collections::BTreeMap<String, u128> = accounts
        .iter()
        .map(|(acct, bal)| (format!("0x{}", hex::encode(acct.address.as_slice())), *bal))
        .collect();
    serde_json::json!({ "alloc": alloc }).to_string()
}

/// Codec sharing the test network secret, for opening wire blobs inside
/// tests.
pub fn test_codec() -> PayloadCodec {
    let enc = Arc::new(DataEncryptionService::new());
    enc.set_key(&SharedSecret::from_bytes(TEST_SECRET));
    PayloadCodec::new(enc, CompressionService::max_compression())
}

/// A user viewing key.
pub struct ViewingKey {
    pub sk: SecretKey,
    pub pk: PublicKey,
}

impl ViewingKey {
    pub fn generate() -> Self {
        let sk = SecretKey::new(&mut OsRng);
        let pk = PublicKey::from_secret_key(SECP256K1, &sk);
        Self { sk, pk }
    }
}

/// Seals an RPC request to the enclave: params under the viewing key,
/// the viewing key bound to the account by signature.
pub fn encrypt_request(
    enclave: &EnclaveService,
    account: &TestAccount,
    vk: &ViewingKey,
    params: serde_json::Value,
) -> Vec<u8> {
    let enclave_pk = enclave.attestation().unwrap().public_key;
    let viewing_pub = vk.pk.serialize();
    let (auth_sig, auth_rec) = sig::sign_recoverable(&viewing_key_digest(&viewing_pub), &account.sk);
    let request = RpcRequest {
        viewing_pub,
        auth_sig,
        auth_rec,
        params: serde_json::to_vec(&params).unwrap(),
    };
    SealedEnvelope::seal_to_bytes(&enclave_pk, &borsh::to_vec(&request).unwrap())
        .unwrap()
        .to_bytes()
}

/// Opens a response sealed to the viewing key.
pub fn decrypt_response(vk: &ViewingKey, blob: &[u8]) -> serde_json::Value {
    let envelope = SealedEnvelope::from_bytes(blob).unwrap();
    let plain = envelope.open(&vk.sk).unwrap();
    serde_json::from_slice(&plain).unwrap()
}
