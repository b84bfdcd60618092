//! Enclave key and shared secret operations.

use velum_primitives::buf::Buf32;

use crate::exec::*;

inst_db_ops! {
    SecretDataOps(velum_db::traits::SecretDatabase) {
        put_enclave_key(key: Buf32) -> ();
        get_enclave_key() -> Option<Buf32>;
        put_shared_secret(secret: Buf32) -> ();
        get_shared_secret() -> Option<Buf32>;
    }
}
