//! The enclave façade: one flat operation surface, one ingestion mutex,
//! one stop gate.

use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::*;
use velum_common::{compression::CompressionService, stopcontrol::StopControl};
use velum_crypto::payload::DataEncryptionService;
use velum_db::{traits::Database, types::PublicTxEntry};
use velum_primitives::buf::Buf20;
use velum_primitives::params::{EnclaveParams, NodeKind};
use velum_state::prelude::*;
use velum_storage::{create_node_storage, NodeStorage};

use crate::{
    attestation::{AttestationProvider, ReportOracle},
    codec::PayloadCodec,
    debug::Debugger,
    errors::{Error, Result, SystemError},
    exec::{BatchExecutor, BatchRegistry},
    genesis::Genesis,
    l1::{CrossChainProcessors, L1BlockProcessor, SharedSecretProcessor},
    mempool::Mempool,
    nodetype::{NodeService, Sequencer, SequencerSettings, Validator},
    rollup::{RollupConsumer, RollupProducer},
    rpc::{self, handlers, EncryptionManager},
    subscription::{SubscriptionId, SubscriptionManager},
    vault::KeyVault,
};

/// Outward state of the enclave.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusCode {
    AwaitingSecret,
    Running,
    Unavailable,
}

#[derive(Clone, Debug)]
pub struct Status {
    pub code: StatusCode,
    pub l1_head: Option<L1BlockId>,
    /// Highest sequencer number stored on this enclave, executed or not.
    pub l2_head: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct BlockSubmissionResponse {
    pub block: L1BlockId,
    pub is_fork: bool,
    pub produced_secret_responses: Vec<ProducedSecretResponse>,
}

/// One element of the `StreamL2Updates` stream.
#[derive(Clone, Debug)]
pub struct StreamL2Update {
    pub batch: ExtBatch,
    pub logs: Vec<Log>,
}

#[derive(Clone, Debug)]
pub struct TransactionListing {
    pub entries: Vec<PublicTxEntry>,
    pub total: u64,
}

#[derive(Clone, Debug)]
pub struct EnclavePublicConfig {
    pub l2_message_bus_address: Buf20,
}

type FacadeResult<T> = std::result::Result<T, SystemError>;

pub struct EnclaveService {
    params: EnclaveParams,
    storage: Arc<NodeStorage>,
    vault: Arc<KeyVault>,
    attestation: AttestationProvider,
    l1_processor: L1BlockProcessor,
    crosschain: Arc<CrossChainProcessors>,
    secret_processor: SharedSecretProcessor,
    rollup_consumer: RollupConsumer,
    registry: Arc<BatchRegistry>,
    node: NodeService,
    subscriptions: Arc<SubscriptionManager>,
    rpc: EncryptionManager,
    debugger: Debugger,
    codec: Arc<PayloadCodec>,

    stop_control: StopControl,
    /// Serialises all state-mutating ingestion to avoid weird races.
    main_mutex: Mutex<()>,
}

impl EnclaveService {
    /// Wires up the whole enclave.  All collaborators are constructed
    /// here and owned by the service; nothing hides in globals.
    pub fn new<D>(
        params: EnclaveParams,
        database: Arc<D>,
        report_oracle: Option<Arc<dyn ReportOracle>>,
    ) -> FacadeResult<Self>
    where
        D: Database + Send + Sync + 'static,
    {
        info!(node_kind = ?params.node_kind, chain_id = params.chain_id, "creating enclave service");

        let attestation = match (params.will_attest, report_oracle) {
            (true, Some(oracle)) => AttestationProvider::Hardware(oracle),
            (true, None) => {
                return Err(SystemError::internal(
                    "attestation required but no hardware report oracle supplied",
                ))
            }
            (false, _) => {
                info!("WARNING - attestation disabled, reports will not be verifiable");
                AttestationProvider::Dummy
            }
        };
        if params.profiler_enabled {
            if params.will_attest {
                warn!("profiler requested on an attested enclave, refusing to run it");
            } else {
                info!("profiler enabled");
            }
        }

        let pool = threadpool::ThreadPool::new(4);
        let storage = Arc::new(create_node_storage(database, pool));

        let data_enc = Arc::new(DataEncryptionService::new());
        let vault = Arc::new(
            KeyVault::load_or_generate(storage.secret().clone(), data_enc.clone())
                .map_err(SystemError::internal)?,
        );

        let genesis =
            Genesis::from_config(params.genesis_json.as_deref()).map_err(SystemError::internal)?;
        let codec = Arc::new(PayloadCodec::new(
            data_enc,
            CompressionService::max_compression(),
        ));
        let crosschain = Arc::new(CrossChainProcessors::new(
            params.message_bus_address,
            params.chain_id,
        ));
        let executor = Arc::new(BatchExecutor::new(
            storage.clone(),
            genesis,
            params.batch_gas_limit,
            params.gas_payment_address,
            crosschain.l2_message_bus_address(),
        ));

        // ensure cached chain state is usable before anything executes
        restore_snapshot_cache(&storage, &executor).map_err(SystemError::internal)?;

        let l1_processor = L1BlockProcessor::new(
            storage.clone(),
            params.validate_l1_blocks,
            params.l1_staleness_bound,
        )
        .map_err(SystemError::internal)?;

        let initial_head = storage
            .batch()
            .get_executed_head_record_blocking()
            .map_err(SystemError::internal)?
            .map(|record| record.batch.seq_no());
        let registry = Arc::new(BatchRegistry::new(
            initial_head,
            params.batch_production_timeout,
        ));

        // the base fee floors the admission price alongside the operator
        // minimum
        let mempool = Arc::new(Mempool::new(params.min_gas_price.max(params.base_fee)));
        let secret_processor = SharedSecretProcessor::new(
            attestation.clone(),
            vault.clone(),
            params.management_contract_address,
        );
        let rollup_consumer = RollupConsumer::new(
            storage.clone(),
            codec.clone(),
            params.sequencer_id,
            params.management_contract_address,
        );

        let node = match params.node_kind {
            NodeKind::Sequencer => {
                let producer = RollupProducer::new(
                    storage.clone(),
                    codec.clone(),
                    vault.clone(),
                    params.max_rollup_size,
                );
                NodeService::Sequencer(Sequencer::new(
                    executor.clone(),
                    registry.clone(),
                    storage.clone(),
                    mempool.clone(),
                    crosschain.clone(),
                    vault.clone(),
                    codec.clone(),
                    producer,
                    SequencerSettings {
                        max_batch_size: params.max_batch_size,
                        batch_gas_limit: params.batch_gas_limit,
                    },
                ))
            }
            NodeKind::Validator => NodeService::Validator(Validator::new(
                executor.clone(),
                registry.clone(),
                storage.clone(),
                params.sequencer_id,
            )),
        };

        let rpc = EncryptionManager::new(
            vault.clone(),
            storage.clone(),
            registry.clone(),
            mempool,
            params.local_execution_cap,
        );
        let debugger = Debugger::new(storage.clone());

        Ok(Self {
            params,
            storage,
            vault,
            attestation,
            l1_processor,
            crosschain,
            secret_processor,
            rollup_consumer,
            registry,
            node,
            subscriptions: Arc::new(SubscriptionManager::new()),
            rpc,
            debugger,
            codec,
            stop_control: StopControl::new(),
            main_mutex: Mutex::new(()),
        })
    }

    fn check_stopping(&self, op: &str) -> FacadeResult<()> {
        if self.stop_control.is_stopping() {
            return Err(SystemError::unavailable(op));
        }
        Ok(())
    }

    fn reject_block_err(&self, cause: Error) -> SystemError {
        SystemError::block_reject(self.l1_processor.head_id(), cause)
    }

    // -- lifecycle & identity ------------------------------------------

    pub fn status(&self) -> FacadeResult<Status> {
        if self.stop_control.is_stopping() {
            return Ok(Status {
                code: StatusCode::Unavailable,
                l1_head: None,
                l2_head: None,
            });
        }

        let code = if self.vault.has_secret() {
            StatusCode::Running
        } else {
            StatusCode::AwaitingSecret
        };
        let l2_head = self
            .storage
            .batch()
            .get_current_seq_blocking()
            .map_err(SystemError::internal)?;
        Ok(Status {
            code,
            l1_head: self.l1_processor.head_id(),
            l2_head,
        })
    }

    pub fn enclave_id(&self) -> FacadeResult<Buf20> {
        Ok(self.vault.enclave_id())
    }

    pub fn attestation(&self) -> FacadeResult<AttestationReport> {
        self.check_stopping("Attestation")?;
        self.attestation
            .report(
                &self.vault.public_bytes(),
                self.params.host_id,
                &self.params.host_address,
            )
            .map_err(SystemError::internal)
    }

    pub fn generate_secret(&self) -> FacadeResult<Vec<u8>> {
        self.check_stopping("GenerateSecret")?;
        self.vault
            .generate_shared_secret()
            .map_err(SystemError::from)
    }

    pub fn init_enclave(&self, envelope: &[u8]) -> FacadeResult<()> {
        self.check_stopping("InitEnclave")?;
        self.vault
            .init_from_envelope(envelope)
            .map_err(SystemError::from)
    }

    pub fn enclave_public_config(&self) -> FacadeResult<EnclavePublicConfig> {
        Ok(EnclavePublicConfig {
            l2_message_bus_address: self.crosschain.l2_message_bus_address(),
        })
    }

    /// Healthy only when storage, the L1 view, and batch production all
    /// are.
    pub fn health_check(&self) -> FacadeResult<bool> {
        self.check_stopping("HealthCheck")?;

        let storage_healthy = self.storage.l1().get_canonical_tip_blocking().is_ok();
        if !storage_healthy {
            info!("health check failed for enclave storage");
            return Ok(false);
        }
        if !self.l1_processor.health_check() {
            info!("health check failed for the L1 block processor");
            return Ok(false);
        }
        // batch-production cadence only binds the node minting batches
        if self.params.is_sequencer() && !self.registry.health_check() {
            info!("health check failed for the batch registry");
            return Ok(false);
        }
        Ok(true)
    }

    /// Blocks new requests and releases the update stream.  In-flight
    /// operations holding the ingestion mutex run to completion.
    pub fn stop(&self) -> FacadeResult<()> {
        self.stop_control.stop();
        self.registry.unsubscribe_from_batches();
        if let Err(err) = self.node.close() {
            error!(%err, "could not close node service");
        }
        Ok(())
    }

    // -- L1 ingestion --------------------------------------------------

    pub fn submit_l1_block(&self, bundle: L1BlockBundle) -> FacadeResult<BlockSubmissionResponse> {
        self.check_stopping("SubmitL1Block")?;

        let _guard = self.main_mutex.lock();

        let height = bundle.header().height;
        info!(block = %bundle.id(), height, "submit L1 block");

        let ingestion = match self.l1_processor.process(&bundle) {
            Ok(ingestion) => ingestion,
            Err(err @ Error::AlreadyProcessed(_)) => {
                debug!(%err, "did not ingest block");
                return Ok(BlockSubmissionResponse {
                    block: bundle.id(),
                    is_fork: false,
                    produced_secret_responses: Vec::new(),
                });
            }
            Err(err) => {
                if err.is_expected() {
                    debug!(%err, block = %bundle.id(), "did not ingest block");
                } else {
                    warn!(%err, block = %bundle.id(), "failed ingesting block");
                }
                return Err(self.reject_block_err(err));
            }
        };

        if ingestion.new_head {
            self.crosschain.process_block(&bundle);
        }

        if let Err(err) = self.rollup_consumer.process_rollups_in_block(&bundle) {
            // the block is already stored at this point
            if err.is_expected() {
                debug!(%err, "rollup consumer");
            } else {
                error!(%err, "error while processing rollups in block");
            }
        }

        if let Some(fork) = &ingestion.fork {
            info!(block = %ingestion.block, height, "detected fork");
            self.crosschain
                .on_fork(fork, &self.storage)
                .map_err(|e| self.reject_block_err(e))?;
            self.node
                .on_l1_fork(fork)
                .map_err(|e| self.reject_block_err(e))?;
        }

        self.node
            .on_l1_block(&bundle, &ingestion)
            .map_err(|e| self.reject_block_err(e))?;

        let produced_secret_responses = self.secret_processor.process_secret_msgs(&bundle);

        Ok(BlockSubmissionResponse {
            block: ingestion.block,
            is_fork: ingestion.is_fork(),
            produced_secret_responses,
        })
    }

    // -- L2 batch lifecycle --------------------------------------------

    pub fn submit_batch(&self, ext: &ExtBatch) -> FacadeResult<()> {
        self.check_stopping("SubmitBatch")?;

        let seq = ext.seq_no();
        info!(seq, batch = %ext.id(), "received new p2p batch");

        if seq > GENESIS_SEQ + 1 {
            let parent = self
                .storage
                .batch()
                .get_batch_by_seq_blocking(seq - 1)
                .map_err(SystemError::internal)?;
            if parent.is_none() {
                return Err(SystemError::from(Error::MissingParentBatch(seq)));
            }
        }

        let batch = self.codec.to_batch(ext).map_err(SystemError::from)?;

        let validator = self.node.validator().map_err(SystemError::internal)?;
        validator
            .verify_sequencer_signature(&batch)
            .map_err(SystemError::internal)?;

        let converted = self.codec.converted_header_hash(batch.signed_header());

        let _guard = self.main_mutex.lock();

        self.storage
            .batch()
            .put_batch_blocking(velum_db::types::BatchRecord::new(batch, converted))
            .map_err(SystemError::internal)?;

        validator
            .execute_stored_batches()
            .map_err(SystemError::internal)?;

        Ok(())
    }

    pub fn create_batch(&self, skip_if_empty: bool) -> FacadeResult<()> {
        self.check_stopping("CreateBatch")?;

        let _guard = self.main_mutex.lock();
        let sequencer = self.node.sequencer().map_err(SystemError::internal)?;
        sequencer
            .create_batch(skip_if_empty)
            .map_err(SystemError::from)
    }

    pub fn create_rollup(&self, from_seq: u64) -> FacadeResult<ExtRollup> {
        self.check_stopping("CreateRollup")?;

        let _guard = self.main_mutex.lock();

        if self.registry.head_batch_seq().is_none() {
            return Err(SystemError::from(Error::NotInitialised));
        }

        let sequencer = self.node.sequencer().map_err(SystemError::internal)?;
        sequencer.create_rollup(from_seq).map_err(SystemError::from)
    }

    pub fn get_batch(&self, hash: BatchId) -> FacadeResult<ExtBatch> {
        let record = self
            .storage
            .batch()
            .get_batch_blocking(&hash)
            .map_err(SystemError::internal)?
            .ok_or_else(|| SystemError::from(Error::NotFound))?;
        self.codec
            .to_ext_batch(&record.batch)
            .map_err(SystemError::internal)
    }

    pub fn get_batch_by_seq_no(&self, seq: u64) -> FacadeResult<ExtBatch> {
        let record = self
            .storage
            .batch()
            .get_batch_by_seq_blocking(seq)
            .map_err(SystemError::internal)?
            .ok_or_else(|| SystemError::from(Error::NotFound))?;
        self.codec
            .to_ext_batch(&record.batch)
            .map_err(SystemError::internal)
    }

    // -- streaming & subscriptions -------------------------------------

    /// Streams every executed batch, plus the subscribed logs of each.
    /// One consumer at a time; attaching replaces the previous stream.
    pub fn stream_l2_updates(&self) -> mpsc::Receiver<StreamL2Update> {
        let (tx, rx) = mpsc::channel();

        if self.stop_control.is_stopping() {
            return rx;
        }

        let codec = self.codec.clone();
        let subscriptions = self.subscriptions.clone();
        let tx = Mutex::new(tx);
        self.registry
            .subscribe_for_executed_batches(Box::new(move |batch, receipts| {
                let ext = match codec.to_ext_batch(batch) {
                    Ok(ext) => ext,
                    Err(err) => {
                        error!(%err, batch = %batch.id(), "failed to convert batch for stream");
                        return;
                    }
                };
                let logs = subscriptions.logs_for_batch(batch, receipts);
                let _ = tx.lock().send(StreamL2Update { batch: ext, logs });
            }));

        rx
    }

    pub fn stop_l2_stream(&self) {
        self.registry.unsubscribe_from_batches();
    }

    /// Registers a log subscription.  The filter arrives sealed to the
    /// enclave key like every other user parameter.
    pub fn subscribe(&self, id: SubscriptionId, encrypted_filter: &[u8]) -> FacadeResult<()> {
        self.check_stopping("Subscribe")?;

        let plain = self
            .vault
            .open_envelope(encrypted_filter)
            .map_err(|e| SystemError::user(format!("could not decrypt subscription: {e}")))?;
        let filter: LogFilter = serde_json::from_slice(&plain)
            .map_err(|e| SystemError::user(format!("malformed subscription filter: {e}")))?;
        self.subscriptions.add_subscription(id, filter);
        Ok(())
    }

    pub fn unsubscribe(&self, id: &SubscriptionId) -> FacadeResult<()> {
        self.check_stopping("Unsubscribe")?;
        self.subscriptions.remove_subscription(id);
        Ok(())
    }

    // -- encrypted user RPCs -------------------------------------------

    pub fn submit_tx(&self, encrypted_params: &[u8]) -> FacadeResult<Vec<u8>> {
        self.check_stopping("SubmitTx")?;
        rpc::with_vk_encryption(
            &self.rpc,
            encrypted_params,
            handlers::submit_tx_validate,
            handlers::submit_tx_execute,
        )
    }

    pub fn obs_call(&self, encrypted_params: &[u8]) -> FacadeResult<Vec<u8>> {
        self.check_stopping("ObsCall")?;
        rpc::with_vk_encryption(
            &self.rpc,
            encrypted_params,
            handlers::obs_call_validate,
            handlers::obs_call_execute,
        )
    }

    pub fn get_balance(&self, encrypted_params: &[u8]) -> FacadeResult<Vec<u8>> {
        self.check_stopping("GetBalance")?;
        rpc::with_vk_encryption(
            &self.rpc,
            encrypted_params,
            handlers::get_balance_validate,
            handlers::get_balance_execute,
        )
    }

    pub fn get_transaction(&self, encrypted_params: &[u8]) -> FacadeResult<Vec<u8>> {
        self.check_stopping("GetTransaction")?;
        rpc::with_vk_encryption(
            &self.rpc,
            encrypted_params,
            handlers::tx_lookup_validate,
            handlers::get_transaction_execute,
        )
    }

    pub fn get_transaction_receipt(&self, encrypted_params: &[u8]) -> FacadeResult<Vec<u8>> {
        self.check_stopping("GetTransactionReceipt")?;
        rpc::with_vk_encryption(
            &self.rpc,
            encrypted_params,
            handlers::tx_lookup_validate,
            handlers::get_transaction_receipt_execute,
        )
    }

    pub fn get_transaction_count(&self, encrypted_params: &[u8]) -> FacadeResult<Vec<u8>> {
        self.check_stopping("GetTransactionCount")?;
        rpc::with_vk_encryption(
            &self.rpc,
            encrypted_params,
            handlers::get_transaction_count_validate,
            handlers::get_transaction_count_execute,
        )
    }

    pub fn get_logs(&self, encrypted_params: &[u8]) -> FacadeResult<Vec<u8>> {
        self.check_stopping("GetLogs")?;
        rpc::with_vk_encryption(
            &self.rpc,
            encrypted_params,
            handlers::get_logs_validate,
            handlers::get_logs_execute,
        )
    }

    pub fn estimate_gas(&self, encrypted_params: &[u8]) -> FacadeResult<Vec<u8>> {
        self.check_stopping("EstimateGas")?;
        rpc::with_vk_encryption(
            &self.rpc,
            encrypted_params,
            handlers::estimate_gas_validate,
            handlers::estimate_gas_execute,
        )
    }

    pub fn get_custom_query(&self, encrypted_params: &[u8]) -> FacadeResult<Vec<u8>> {
        self.check_stopping("GetCustomQuery")?;
        rpc::with_vk_encryption(
            &self.rpc,
            encrypted_params,
            handlers::get_custom_query_validate,
            handlers::get_custom_query_execute,
        )
    }

    // -- public reads --------------------------------------------------

    pub fn get_code(&self, address: Buf20, batch: Option<BatchId>) -> FacadeResult<Vec<u8>> {
        self.check_stopping("GetCode")?;

        let id = match batch {
            Some(id) => id,
            None => self
                .storage
                .batch()
                .get_executed_head_blocking()
                .map_err(SystemError::internal)?
                .unwrap_or_else(BatchId::zero),
        };
        let snapshot = self
            .storage
            .snapshot()
            .get_snapshot_blocking(&id)
            .map_err(SystemError::internal)?
            .ok_or_else(|| SystemError::from(Error::MissingSnapshot(id)))?;
        Ok(snapshot.code(&address).to_vec())
    }

    pub fn get_public_transaction_data(
        &self,
        offset: u64,
        limit: u64,
    ) -> FacadeResult<TransactionListing> {
        self.check_stopping("GetPublicTransactionData")?;

        let entries = self
            .storage
            .batch()
            .get_tx_page_blocking(offset, limit)
            .map_err(SystemError::internal)?;
        let total = self
            .storage
            .batch()
            .count_executed_txs_blocking()
            .map_err(SystemError::internal)?;
        Ok(TransactionListing { entries, total })
    }

    pub fn get_total_contract_count(&self) -> FacadeResult<u64> {
        self.check_stopping("GetTotalContractCount")?;
        self.storage
            .batch()
            .count_contracts_blocking()
            .map_err(SystemError::internal)
    }

    // -- debug namespace -----------------------------------------------

    pub fn debug_trace_transaction(
        &self,
        hash: TxId,
        config: Option<serde_json::Value>,
    ) -> FacadeResult<serde_json::Value> {
        self.check_stopping("DebugTraceTransaction")?;
        if !self.params.debug_namespace_enabled {
            return Err(SystemError::from(Error::DebugDisabled));
        }
        self.debugger
            .trace_transaction(hash, config)
            .map_err(SystemError::from)
    }

    pub fn debug_event_log_relevancy(&self, hash: TxId) -> FacadeResult<serde_json::Value> {
        self.check_stopping("DebugEventLogRelevancy")?;
        if !self.params.debug_namespace_enabled {
            return Err(SystemError::from(Error::DebugDisabled));
        }
        self.debugger
            .event_log_relevancy(hash)
            .map_err(SystemError::from)
    }
}

/// Makes sure the state snapshots the batch chain needs are present,
/// replaying persisted batches when they aren't.  A clean shutdown makes
/// this a no-op.
fn restore_snapshot_cache(storage: &Arc<NodeStorage>, executor: &BatchExecutor) -> Result<()> {
    let Some(head) = storage.batch().get_executed_head_record_blocking()? else {
        // not initialised yet, nothing to rebuild
        return Ok(());
    };

    // walk backwards collecting batches without a usable snapshot
    let mut to_replay = Vec::new();
    let mut cursor = head;
    loop {
        if storage
            .snapshot()
            .has_snapshot_blocking(&cursor.batch.id())?
        {
            break;
        }
        let parent = cursor.batch.header().parent;
        to_replay.push(cursor.batch);
        if parent.is_zero() {
            break;
        }
        cursor = storage
            .batch()
            .get_batch_blocking(&parent)?
            .ok_or(Error::MissingBatch(parent))?;
    }

    if to_replay.is_empty() {
        return Ok(());
    }
    info!(
        from = to_replay.last().map(|b| b.seq_no()).unwrap_or_default(),
        to = to_replay.first().map(|b| b.seq_no()).unwrap_or_default(),
        "rebuilding state snapshot cache from persisted batches"
    );

    // replay oldest first
    for batch in to_replay.iter().rev() {
        if batch.header().parent.is_zero() {
            executor.commit_genesis_state()?;
        }
        let computed = executor.replay_batch(batch)?;
        storage
            .snapshot()
            .put_snapshot_blocking(batch.id(), computed.state.clone())?;
    }

    Ok(())
}
