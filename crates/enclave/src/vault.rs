//! The key vault: owns the enclave identity key and the shared network
//! secret, and performs every envelope operation involving them.

use std::sync::Arc;

use parking_lot::RwLock;
use secp256k1::PublicKey;
use tracing::*;
use velum_crypto::{
    envelope::SealedEnvelope,
    keys::EnclaveKey,
    payload::DataEncryptionService,
    secret::SharedSecret,
    CryptoError,
};
use velum_primitives::buf::{Buf20, Buf32, Buf64};
use velum_storage::SecretManager;

use crate::errors::{Error, Result};

pub struct KeyVault {
    key: EnclaveKey,
    secrets: Arc<SecretManager>,
    data_enc: Arc<DataEncryptionService>,
    shared: RwLock<Option<SharedSecret>>,
}

impl KeyVault {
    /// Loads the identity key from storage, generating and persisting a
    /// fresh one on first boot.  If a shared secret is already stored the
    /// payload cipher is keyed immediately.
    pub fn load_or_generate(
        secrets: Arc<SecretManager>,
        data_enc: Arc<DataEncryptionService>,
    ) -> Result<Self> {
        let key = match secrets.get_enclave_key_blocking()? {
            Some(raw) => EnclaveKey::from_secret_bytes(&raw)?,
            None => {
                info!("generating new enclave key");
                let key = EnclaveKey::generate();
                secrets.put_enclave_key_blocking(key.secret_bytes())?;
                key
            }
        };
        info!(enclave_id = %format!("{:?}", key.enclave_id()), "enclave key available");

        let shared = secrets
            .get_shared_secret_blocking()?
            .map(|raw| SharedSecret::from_buf(&raw));
        if let Some(secret) = &shared {
            data_enc.set_key(secret);
        }

        Ok(Self {
            key,
            secrets,
            data_enc,
            shared: RwLock::new(shared),
        })
    }

    pub fn enclave_id(&self) -> Buf20 {
        self.key.enclave_id()
    }

    pub fn public_bytes(&self) -> [u8; 33] {
        self.key.public_bytes()
    }

    pub fn sign(&self, msg: &Buf32) -> (Buf64, u8) {
        self.key.sign(msg)
    }

    pub fn has_secret(&self) -> bool {
        self.shared.read().is_some()
    }

    fn adopt_secret(&self, secret: SharedSecret) -> Result<()> {
        self.secrets.put_shared_secret_blocking(secret.to_buf())?;
        self.data_enc.set_key(&secret);
        *self.shared.write() = Some(secret);
        Ok(())
    }

    /// Genesis path: mint the network secret and return it sealed to our
    /// own key, so the host can persist and relay an envelope it cannot
    /// read.
    pub fn generate_shared_secret(&self) -> Result<Vec<u8>> {
        let secret = SharedSecret::generate();
        self.adopt_secret(secret)?;
        self.sealed_secret_for(self.key.public_key())
    }

    /// Joiner path: open an envelope produced by a peer for us and adopt
    /// the secret inside.
    pub fn init_from_envelope(&self, raw: &[u8]) -> Result<()> {
        let envelope = SealedEnvelope::from_bytes(raw)?;
        let plain = envelope.open(self.key.secret_key())?;
        let bytes: [u8; 32] = plain
            .as_slice()
            .try_into()
            .map_err(|_| Error::Crypto(CryptoError::MalformedEnvelope("bad secret length".into())))?;
        self.adopt_secret(SharedSecret::from_bytes(bytes))?;
        trace!("shared secret decrypted and stored");
        Ok(())
    }

    /// Opens any envelope addressed to this enclave's key; the RPC layer
    /// uses this for viewing-key-wrapped requests.
    pub fn open_envelope(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let envelope = SealedEnvelope::from_bytes(raw)?;
        Ok(envelope.open(self.key.secret_key())?)
    }

    /// Seals the shared secret for a verified peer key.
    pub fn sealed_secret_for(&self, peer: &PublicKey) -> Result<Vec<u8>> {
        let guard = self.shared.read();
        let secret = guard.as_ref().ok_or(Error::NotInitialised)?;
        let envelope = SealedEnvelope::seal(peer, secret.as_bytes())?;
        Ok(envelope.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use velum_crypto::payload::DataEncryptionService;
    use velum_db::{stubs::StubDatabase, traits::Database};
    use velum_storage::SecretManager;

    use super::KeyVault;

    fn mkvault() -> (KeyVault, Arc<StubDatabase>) {
        let db = Arc::new(StubDatabase::new());
        let pool = threadpool::ThreadPool::new(1);
        let secrets = Arc::new(SecretManager::new(pool, db.secret_db().clone()));
        let vault = KeyVault::load_or_generate(secrets, Arc::new(DataEncryptionService::new()))
            .expect("vault init");
        (vault, db)
    }

    #[test]
    fn test_key_survives_restart() {
        let db = Arc::new(StubDatabase::new());
        let mk = |db: &Arc<StubDatabase>| {
            let pool = threadpool::ThreadPool::new(1);
            let secrets = Arc::new(SecretManager::new(pool, db.secret_db().clone()));
            KeyVault::load_or_generate(secrets, Arc::new(DataEncryptionService::new())).unwrap()
        };
        let first = mk(&db);
        let second = mk(&db);
        assert_eq!(first.enclave_id(), second.enclave_id());
    }

    #[test]
    fn test_secret_exchange() {
        let (alice, _) = mkvault();
        let (bob, _) = mkvault();

        // Alice mints; Bob cannot open Alice's self-envelope.
        let self_envelope = alice.generate_shared_secret().unwrap();
        assert!(bob.init_from_envelope(&self_envelope).is_err());

        // A properly addressed envelope works.
        let bob_pk = secp256k1::PublicKey::from_slice(&bob.public_bytes()).unwrap();
        let for_bob = alice.sealed_secret_for(&bob_pk).unwrap();
        bob.init_from_envelope(&for_bob).unwrap();
        assert!(bob.has_secret());
    }
}
