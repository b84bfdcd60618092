//! The two enclave roles.  Shared capabilities dispatch by pattern match;
//! role-specific operations are reached through the checked accessors.

pub mod sequencer;
pub mod validator;

pub use sequencer::{Sequencer, SequencerSettings};
pub use validator::Validator;

use velum_state::prelude::*;

use crate::errors::{Error, Result};

pub enum NodeService {
    Sequencer(Sequencer),
    Validator(Validator),
}

impl NodeService {
    pub fn on_l1_block(&self, bundle: &L1BlockBundle, ingestion: &BlockIngestion) -> Result<()> {
        match self {
            NodeService::Sequencer(s) => s.on_l1_block(bundle, ingestion),
            NodeService::Validator(v) => v.on_l1_block(bundle, ingestion),
        }
    }

    pub fn on_l1_fork(&self, fork: &ChainFork) -> Result<()> {
        match self {
            NodeService::Sequencer(s) => s.on_l1_fork(fork),
            NodeService::Validator(v) => v.on_l1_fork(fork),
        }
    }

    pub fn close(&self) -> Result<()> {
        match self {
            NodeService::Sequencer(s) => s.close(),
            NodeService::Validator(v) => v.close(),
        }
    }

    pub fn sequencer(&self) -> Result<&Sequencer> {
        match self {
            NodeService::Sequencer(s) => Ok(s),
            NodeService::Validator(_) => Err(Error::InvalidRequest(
                "operation requires the sequencer role".into(),
            )),
        }
    }

    pub fn validator(&self) -> Result<&Validator> {
        match self {
            NodeService::Validator(v) => Ok(v),
            NodeService::Sequencer(_) => Err(Error::InvalidRequest(
                "operation requires the validator role".into(),
            )),
        }
    }
}
