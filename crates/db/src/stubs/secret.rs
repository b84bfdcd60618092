use parking_lot::Mutex;
use velum_primitives::buf::Buf32;

use crate::{errors::DbError, traits::SecretDatabase, DbResult};

#[derive(Default)]
pub struct StubSecretDb {
    enclave_key: Mutex<Option<Buf32>>,
    shared_secret: Mutex<Option<Buf32>>,
}

impl StubSecretDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretDatabase for StubSecretDb {
    fn put_enclave_key(&self, key: Buf32) -> DbResult<()> {
        let mut slot = self.enclave_key.lock();
        if slot.is_some() {
            return Err(DbError::Overwrite("enclave_key"));
        }
        *slot = Some(key);
        Ok(())
    }

    fn get_enclave_key(&self) -> DbResult<Option<Buf32>> {
        Ok(*self.enclave_key.lock())
    }

    fn put_shared_secret(&self, secret: Buf32) -> DbResult<()> {
        let mut slot = self.shared_secret.lock();
        if slot.is_some() {
            return Err(DbError::Overwrite("shared_secret"));
        }
        *slot = Some(secret);
        Ok(())
    }

    fn get_shared_secret(&self) -> DbResult<Option<Buf32>> {
        Ok(*self.shared_secret.lock())
    }
}
