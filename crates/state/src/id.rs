use std::fmt;

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use velum_primitives::buf::Buf32;

macro_rules! hash_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Copy,
            Clone,
            Eq,
            Default,
            PartialEq,
            Ord,
            PartialOrd,
            Hash,
            Arbitrary,
            BorshSerialize,
            BorshDeserialize,
            Serialize,
            Deserialize,
        )]
        pub struct $name(Buf32);

        impl $name {
            pub fn zero() -> Self {
                Self(Buf32::zero())
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }
        }

        impl From<Buf32> for $name {
            fn from(value: Buf32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Buf32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<[u8; 32]> for $name {
            fn as_ref(&self) -> &[u8; 32] {
                self.0.as_ref()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(&self.0, f)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

hash_id! {
    /// ID of an L1 block, the hash of its header.
    L1BlockId
}

hash_id! {
    /// ID of an L2 batch, the hash of its signed header.
    BatchId
}

hash_id! {
    /// ID of an L2 transaction.
    TxId
}

hash_id! {
    /// ID of a rollup, the hash of its signed header.
    RollupId
}
