use std::sync::Arc;

use threadpool::ThreadPool;
use velum_db::{traits::SecretDatabase, DbResult};
use velum_primitives::buf::Buf32;

use crate::ops;

/// Interface over the secret store.  Secrets are loaded once at startup
/// and held in the vault, so nothing here caches.
pub struct SecretManager {
    ops: ops::secret::SecretDataOps,
}

impl SecretManager {
    pub fn new<D: SecretDatabase + Sync + Send + 'static>(pool: ThreadPool, db: Arc<D>) -> Self {
        let ops = ops::secret::SecretDataOps::new(pool, db);
        Self { ops }
    }

    pub fn put_enclave_key_blocking(&self, key: Buf32) -> DbResult<()> {
        self.ops.put_enclave_key_blocking(key)
    }

    pub fn get_enclave_key_blocking(&self) -> DbResult<Option<Buf32>> {
        self.ops.get_enclave_key_blocking()
    }

    pub fn put_shared_secret_blocking(&self, secret: Buf32) -> DbResult<()> {
        self.ops.put_shared_secret_blocking(secret)
    }

    pub fn get_shared_secret_blocking(&self) -> DbResult<Option<Buf32>> {
        self.ops.get_shared_secret_blocking()
    }
}
