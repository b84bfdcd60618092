//! The encrypted RPC envelope.
//!
//! Every user-originating call follows the same shape: the parameters
//! arrive sealed to the enclave key together with a viewing key and the
//! account signature binding that key to the claimed `from` address; the
//! response leaves sealed to the viewing key.  Cleartext of neither side
//! ever crosses the enclave boundary.

pub mod handlers;

use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::*;
use velum_crypto::envelope::SealedEnvelope;
use velum_primitives::{
    buf::{Buf20, Buf32, Buf64},
    hash,
};
use velum_state::prelude::*;
use velum_storage::NodeStorage;

use crate::{
    errors::{Error, Result, SystemError},
    exec::BatchRegistry,
    mempool::Mempool,
    vault::KeyVault,
};

/// Wire form of an encrypted request, carried inside the sealed envelope.
#[derive(Clone, Debug, BorshDeserialize, BorshSerialize)]
pub struct RpcRequest {
    /// Compressed public half of the caller's viewing key.
    pub viewing_pub: [u8; 33],

    /// Account signature binding the viewing key to the `from` address.
    pub auth_sig: Buf64,
    pub auth_rec: u8,

    /// JSON-encoded call parameters.
    pub params: Vec<u8>,
}

/// Digest an account signs to register a viewing key.
pub fn viewing_key_digest(viewing_pub: &[u8; 33]) -> Buf32 {
    let mut buf = Vec::with_capacity(50);
    buf.extend_from_slice(b"velum.viewing_key");
    buf.extend_from_slice(viewing_pub);
    hash::raw(&buf)
}

/// Reference to the state a read executes against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockRef {
    Latest,
    Batch(BatchId),
}

impl Serialize for BlockRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BlockRef::Latest => serializer.serialize_str("latest"),
            BlockRef::Batch(id) => Serialize::serialize(id, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for BlockRef {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = <String as Deserialize>::deserialize(deserializer)?;
        if raw == "latest" {
            return Ok(BlockRef::Latest);
        }
        let hex_part = raw.strip_prefix("0x").unwrap_or(&raw);
        let bytes = hex::decode(hex_part).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("block ref: bad hash length"))?;
        Ok(BlockRef::Batch(BatchId::from(Buf32::from(arr))))
    }
}

/// Shared context the typed handlers execute against.
pub struct EncryptionManager {
    vault: Arc<KeyVault>,
    storage: Arc<NodeStorage>,
    registry: Arc<BatchRegistry>,
    mempool: Arc<Mempool>,
    local_execution_cap: u64,
}

impl EncryptionManager {
    pub fn new(
        vault: Arc<KeyVault>,
        storage: Arc<NodeStorage>,
        registry: Arc<BatchRegistry>,
        mempool: Arc<Mempool>,
        local_execution_cap: u64,
    ) -> Self {
        Self {
            vault,
            storage,
            registry,
            mempool,
            local_execution_cap,
        }
    }

    pub fn storage(&self) -> &Arc<NodeStorage> {
        &self.storage
    }

    pub fn registry(&self) -> &Arc<BatchRegistry> {
        &self.registry
    }

    pub fn mempool(&self) -> &Arc<Mempool> {
        &self.mempool
    }

    pub fn local_execution_cap(&self) -> u64 {
        self.local_execution_cap
    }

    /// Opens an incoming envelope and recovers the address the viewing
    /// key is bound to.
    pub fn decrypt_request(&self, blob: &[u8]) -> Result<(RpcRequest, Buf20)> {
        let plain = self.vault.open_envelope(blob)?;
        let request: RpcRequest =
            borsh::from_slice(&plain).map_err(|e| Error::Codec(e.to_string()))?;
        let bound = velum_crypto::sig::recover_signer(
            &viewing_key_digest(&request.viewing_pub),
            &request.auth_sig,
            request.auth_rec,
        )?;
        Ok((request, bound))
    }

    /// Seals a response value to the caller's viewing key.
    pub fn encrypt_response(
        &self,
        viewing_pub: &[u8; 33],
        value: &serde_json::Value,
    ) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(value).map_err(|e| Error::Codec(e.to_string()))?;
        let envelope = SealedEnvelope::seal_to_bytes(viewing_pub, &body)?;
        Ok(envelope.to_bytes())
    }

    /// Resolves the snapshot a read executes against.
    pub fn snapshot_at(&self, block: &BlockRef) -> Result<StateSnapshot> {
        let id = match block {
            BlockRef::Batch(id) => *id,
            BlockRef::Latest => match self.storage.batch().get_executed_head_blocking()? {
                Some(id) => id,
                None => BatchId::zero(),
            },
        };
        match self.storage.snapshot().get_snapshot_blocking(&id)? {
            Some(snapshot) => Ok(snapshot),
            None if id.is_zero() => Ok(StateSnapshot::new()),
            None => Err(Error::MissingSnapshot(id)),
        }
    }
}

/// Runs one encrypted call through its `(validate, execute)` pair.
///
/// `validate` may pin the address the request claims to act for; when it
/// does, the viewing-key binding must match it.  `execute` receives the
/// authenticated address and performs its own per-datum authorization.
/// User-level failures are sealed back to the caller; only systemic
/// failures surface as [`SystemError`].
pub fn with_vk_encryption<Req, Resp, V, E>(
    mgr: &EncryptionManager,
    blob: &[u8],
    validate: V,
    execute: E,
) -> std::result::Result<Vec<u8>, SystemError>
where
    Req: DeserializeOwned,
    Resp: Serialize,
    V: FnOnce(&Req) -> Result<Option<Buf20>>,
    E: FnOnce(&EncryptionManager, &Req, Buf20) -> Result<Resp>,
{
    let (request, bound) = mgr
        .decrypt_request(blob)
        .map_err(|e| SystemError::user(format!("could not decrypt request: {e}")))?;

    let seal_error = |msg: String| -> std::result::Result<Vec<u8>, SystemError> {
        let value = serde_json::json!({ "error": msg });
        mgr.encrypt_response(&request.viewing_pub, &value)
            .map_err(SystemError::internal)
    };

    let parsed: Req = match serde_json::from_slice(&request.params) {
        Ok(p) => p,
        Err(err) => return seal_error(format!("malformed parameters: {err}")),
    };

    match validate(&parsed) {
        Ok(Some(claimed)) if claimed != bound => {
            debug!("viewing key does not match claimed from address");
            return seal_error("viewing key is not bound to the from address".into());
        }
        Ok(_) => {}
        Err(err) => return seal_error(err.to_string()),
    }

    match execute(mgr, &parsed, bound) {
        Ok(resp) => {
            let value = serde_json::json!({ "result": resp });
            mgr.encrypt_response(&request.viewing_pub, &value)
                .map_err(SystemError::internal)
        }
        Err(err) => {
            let sys: SystemError = err.into();
            match sys.kind {
                crate::errors::SystemErrorKind::UserFacing => seal_error(sys.message),
                _ => Err(sys),
            }
        }
    }
}
