use std::sync::Arc;

use async_trait::async_trait;
use jsonrpsee::core::RpcResult;
use jsonrpsee::types::error::ErrorCode;
use jsonrpsee::types::ErrorObjectOwned;
use serde::Deserialize;
use starknet_api::block::{BlockNumber, BlockStatus};
use starknet_api::core::{ClassHash, ContractAddress, Nonce};
use starknet_api::hash::StarkFelt;
use starknet_api::state::StorageKey;
use starknet_api::transaction::{Fee, TransactionHash, TransactionVersion};
use tokio::sync::broadcast;
use tracing::instrument;

use super::{
    AddDeclareOkResult,
    AddDeployAccountOkResult,
    AddInvokeOkResult,
    BlockHashAndNumber,
    BlockHashOrNumber,
    BlockId,
    GeneralContractClass,
    JsonRpcServer,
    JsonRpcV0_5Server,
    JunoRpcServer,
    Schema,
    Tag,
};
use crate::block::{adapt_header, block_status, Block};
use crate::broadcasted_transaction::{gateway_transaction, BroadcastedTransaction};
use crate::error::{
    ContractError,
    JsonRpcError,
    TransactionExecutionError,
    unexpected_error,
    BLOCK_NOT_FOUND,
    CLASS_HASH_NOT_FOUND,
    CONTRACT_NOT_FOUND,
    INVALID_TRANSACTION_INDEX,
    NO_BLOCKS,
    PAGE_SIZE_TOO_BIG,
    SUBSCRIPTION_NOT_FOUND,
    TOO_MANY_KEYS_IN_FILTER,
    TRANSACTION_HASH_NOT_FOUND,
};
use crate::event::{filter_events, EventFilter, EventsChunk};
use crate::execution::{
    adapt_broadcasted_transactions,
    paid_fees_on_l1,
    FeeEstimate,
    MessageFromL1,
    PriceUnit,
    SimulatedTransaction,
    SimulationFlag,
    TracedBlockTransaction,
};
use crate::gateway::{starknet_error_to_write_error, GatewayError, SharedGateway};
use crate::network::Network;
use crate::reader::{Block as StoredBlock, Class, Header, L1Head, SharedReader, StateReader};
use crate::state::{adapt_state_update, StateUpdate};
use crate::subscription::{RpcConn, SubscriptionId, SubscriptionRegistry};
use crate::sync_reader::SharedSyncReader;
use crate::syncing_state::{SyncStatus, SyncingState};
use crate::transaction::{
    adapt_receipt,
    adapt_status,
    adapt_transaction,
    status_from_gateway,
    TransactionReceipt,
    TransactionStatus,
    TransactionWithHash,
    Transactions,
};
use crate::vm::{BlockContext, ExecutionFlags, FunctionCall, SharedVm, VmError};
use crate::{internal_server_error, CURRENT_SPEC_VERSION, LEGACY_SPEC_VERSION};

/// Rpc server. One instance serves both wire schemas; the legacy method set
/// re-enters the same logic with [`Schema::Legacy`].
#[derive(Clone)]
pub struct JsonRpcServerImpl {
    pub network: Network,
    pub reader: SharedReader,
    pub sync_reader: Option<SharedSyncReader>,
    pub gateway: Option<SharedGateway>,
    pub vm: SharedVm,
    pub max_events_chunk_size: usize,
    pub max_events_keys: usize,
    pub filter_limit: usize,
    pub node_version: String,
    pub subscriptions: Arc<SubscriptionRegistry>,
}

impl JsonRpcServerImpl {
    pub fn new(
        network: Network,
        reader: SharedReader,
        vm: SharedVm,
        max_events_chunk_size: usize,
        max_events_keys: usize,
        node_version: impl Into<String>,
    ) -> Self {
        Self {
            network,
            reader,
            sync_reader: None,
            gateway: None,
            vm,
            max_events_chunk_size,
            max_events_keys,
            filter_limit: usize::MAX,
            node_version: node_version.into(),
            subscriptions: Arc::new(SubscriptionRegistry::new()),
        }
    }

    pub fn with_sync_reader(mut self, sync_reader: SharedSyncReader) -> Self {
        self.sync_reader = Some(sync_reader);
        self
    }

    pub fn with_gateway(mut self, gateway: SharedGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Caps the number of canonical blocks a single event query reads.
    pub fn with_filter_limit(mut self, filter_limit: usize) -> Self {
        self.filter_limit = filter_limit;
        self
    }

    /// Replaces the subscription id generator. Test hook.
    pub fn with_id_gen(
        self,
        id_gen: impl Fn() -> SubscriptionId + Send + Sync + 'static,
    ) -> Self {
        self.subscriptions.set_id_gen(Box::new(id_gen));
        self
    }

    // Block identifier resolution. Reader failures all coalesce into
    // BLOCK_NOT_FOUND; the storage error kinds stay inside the node.

    fn block_header_by_id(&self, block_id: BlockId) -> Result<Header, ErrorObjectOwned> {
        match block_id {
            BlockId::Tag(Tag::Latest) => self.reader.heads_header(),
            BlockId::Tag(Tag::Pending) => match self.reader.pending() {
                Ok(pending) => Ok(pending.block.header),
                // The pending block legitimately may not exist; fall through
                // to the latest one.
                Err(_) => self.reader.heads_header(),
            },
            BlockId::HashOrNumber(BlockHashOrNumber::Hash(hash)) => {
                self.reader.block_header_by_hash(&hash)
            }
            BlockId::HashOrNumber(BlockHashOrNumber::Number(number)) => {
                self.reader.block_header_by_number(number)
            }
        }
        .map_err(|_| ErrorObjectOwned::from(BLOCK_NOT_FOUND))
    }

    fn block_by_id(&self, block_id: BlockId) -> Result<StoredBlock, ErrorObjectOwned> {
        match block_id {
            BlockId::Tag(Tag::Latest) => self.reader.head(),
            BlockId::Tag(Tag::Pending) => match self.reader.pending() {
                Ok(pending) => Ok(pending.block),
                Err(_) => self.reader.head(),
            },
            BlockId::HashOrNumber(BlockHashOrNumber::Hash(hash)) => {
                self.reader.block_by_hash(&hash)
            }
            BlockId::HashOrNumber(BlockHashOrNumber::Number(number)) => {
                self.reader.block_by_number(number)
            }
        }
        .map_err(|_| ErrorObjectOwned::from(BLOCK_NOT_FOUND))
    }

    fn state_by_id(&self, block_id: BlockId) -> Result<Box<dyn StateReader>, ErrorObjectOwned> {
        match block_id {
            BlockId::Tag(Tag::Latest) => self.reader.head_state(),
            BlockId::Tag(Tag::Pending) => match self.reader.pending_state() {
                Ok(state) => Ok(state),
                Err(_) => self.reader.head_state(),
            },
            BlockId::HashOrNumber(BlockHashOrNumber::Hash(hash)) => {
                self.reader.state_at_block_hash(&hash)
            }
            BlockId::HashOrNumber(BlockHashOrNumber::Number(number)) => {
                self.reader.state_at_block_number(number)
            }
        }
        .map_err(|_| ErrorObjectOwned::from(BLOCK_NOT_FOUND))
    }

    fn l1_head(&self) -> Option<L1Head> {
        self.reader.l1_head().ok()
    }

    fn stored_block_status(&self, header: &Header) -> BlockStatus {
        if header.is_pending() {
            BlockStatus::Pending
        } else {
            block_status(header.number, self.l1_head().as_ref())
        }
    }

    /// The block environment an execution against this header runs in. The
    /// pending block has no number of its own yet; it executes as the block
    /// after the current head.
    fn execution_block_context(&self, header: &Header) -> Result<BlockContext, ErrorObjectOwned> {
        let block_number = if header.is_pending() {
            self.reader
                .height()
                .map_err(|_| ErrorObjectOwned::from(BLOCK_NOT_FOUND))?
                .next()
        } else {
            header.number
        };
        Ok(BlockContext {
            network: self.network,
            block_number,
            timestamp: header.timestamp,
            sequencer_address: header
                .sequencer_address
                .unwrap_or_else(|| self.network.fallback_sequencer_address()),
            gas_price_wei: header.eth_l1_gas_price,
            gas_price_fri: header.strk_l1_gas_price,
        })
    }

    fn vm_error(schema: Schema, err: VmError) -> ErrorObjectOwned {
        match err {
            VmError::ResourceBusy => unexpected_error("resource busy".to_owned()).into(),
            VmError::TransactionExecutionError { transaction_index, cause } => match schema {
                Schema::Current => JsonRpcError::from(TransactionExecutionError {
                    transaction_index,
                    execution_error: cause,
                })
                .into(),
                Schema::Legacy => {
                    JsonRpcError::from(ContractError { revert_error: cause }).into()
                }
            },
            VmError::Execution(cause) => unexpected_error(cause).into(),
        }
    }

    fn fee_estimate(
        &self,
        header: &Header,
        version: TransactionVersion,
        overall_fee: Fee,
        schema: Schema,
    ) -> FeeEstimate {
        let (gas_price, unit) = if version == TransactionVersion::THREE {
            (header.strk_l1_gas_price, PriceUnit::Fri)
        } else {
            (header.eth_l1_gas_price, PriceUnit::Wei)
        };
        let unit = match schema {
            Schema::Current => Some(unit),
            Schema::Legacy => None,
        };
        FeeEstimate::from(gas_price, overall_fee, unit)
    }

    fn block_w_transaction_hashes(&self, block_id: BlockId) -> RpcResult<Block> {
        let block = self.block_by_id(block_id)?;
        Ok(Block {
            status: self.stored_block_status(&block.header),
            header: adapt_header(&block.header),
            transactions: Transactions::Hashes(block.transaction_hashes),
        })
    }

    fn block_w_full_transactions(&self, block_id: BlockId, schema: Schema) -> RpcResult<Block> {
        let block = self.block_by_id(block_id)?;
        let status = self.stored_block_status(&block.header);
        let transactions = block
            .transactions
            .into_iter()
            .zip(block.transaction_hashes)
            .map(|(transaction, transaction_hash)| {
                adapt_transaction(transaction, transaction_hash, schema)
            })
            .collect();
        Ok(Block {
            status,
            header: adapt_header(&block.header),
            transactions: Transactions::Full(transactions),
        })
    }

    fn transaction_by_hash(
        &self,
        transaction_hash: TransactionHash,
        schema: Schema,
    ) -> RpcResult<TransactionWithHash> {
        let transaction = self
            .reader
            .transaction_by_hash(&transaction_hash)
            .map_err(|_| ErrorObjectOwned::from(TRANSACTION_HASH_NOT_FOUND))?;
        Ok(adapt_transaction(transaction, transaction_hash, schema))
    }

    fn transaction_by_block_id_and_index(
        &self,
        block_id: BlockId,
        index: i64,
        schema: Schema,
    ) -> RpcResult<TransactionWithHash> {
        let index: usize = index
            .try_into()
            .map_err(|_| ErrorObjectOwned::from(INVALID_TRANSACTION_INDEX))?;
        if let BlockId::Tag(Tag::Pending) = block_id {
            let block = self.block_by_id(block_id)?;
            let (transaction, transaction_hash) = block
                .transactions
                .into_iter()
                .zip(block.transaction_hashes)
                .nth(index)
                .ok_or_else(|| ErrorObjectOwned::from(INVALID_TRANSACTION_INDEX))?;
            return Ok(adapt_transaction(transaction, transaction_hash, schema));
        }
        let header = self.block_header_by_id(block_id)?;
        let (transaction, transaction_hash) = self
            .reader
            .transaction_by_block_number_and_index(header.number, index)
            .map_err(|_| ErrorObjectOwned::from(INVALID_TRANSACTION_INDEX))?;
        Ok(adapt_transaction(transaction, transaction_hash, schema))
    }

    fn transaction_receipt(
        &self,
        transaction_hash: TransactionHash,
        schema: Schema,
    ) -> RpcResult<TransactionReceipt> {
        let transaction = self
            .reader
            .transaction_by_hash(&transaction_hash)
            .map_err(|_| ErrorObjectOwned::from(TRANSACTION_HASH_NOT_FOUND))?;
        let (receipt, block_hash, block_number) = self
            .reader
            .receipt(&transaction_hash)
            .map_err(|_| ErrorObjectOwned::from(TRANSACTION_HASH_NOT_FOUND))?;
        let block = block_hash.map(|hash| (hash, block_number));
        Ok(adapt_receipt(&transaction, receipt, block, self.l1_head().as_ref(), schema))
    }

    async fn execute(
        &self,
        transactions: Vec<starknet_api::transaction::Transaction>,
        declared_classes: Vec<Class>,
        paid_fees: Vec<Fee>,
        block_context: BlockContext,
        state: Box<dyn StateReader>,
        flags: ExecutionFlags,
        schema: Schema,
    ) -> RpcResult<crate::vm::ExecutionOutput> {
        let vm = self.vm.clone();
        tokio::task::spawn_blocking(move || {
            vm.execute(transactions, declared_classes, paid_fees, block_context, state, flags)
        })
        .await
        .map_err(internal_server_error)?
        .map_err(|err| Self::vm_error(schema, err))
    }

    async fn estimate_fee_impl(
        &self,
        request: Vec<BroadcastedTransaction>,
        simulation_flags: Vec<SimulationFlag>,
        block_id: BlockId,
        schema: Schema,
    ) -> RpcResult<Vec<FeeEstimate>> {
        let executable = adapt_broadcasted_transactions(request)?;
        let state = self.state_by_id(block_id)?;
        let header = self.block_header_by_id(block_id)?;
        let block_context = self.execution_block_context(&header)?;
        let flags = ExecutionFlags {
            skip_fee_charge: true,
            skip_validate: simulation_flags.contains(&SimulationFlag::SkipValidate),
            err_on_revert: true,
            legacy_traces: schema == Schema::Legacy,
        };
        let versions = executable.versions.clone();
        let output = self
            .execute(
                executable.transactions,
                executable.declared_classes,
                vec![],
                block_context,
                state,
                flags,
                schema,
            )
            .await?;
        Ok(output
            .overall_fees
            .into_iter()
            .zip(versions)
            .map(|(fee, version)| self.fee_estimate(&header, version, fee, schema))
            .collect())
    }

    async fn estimate_message_fee_impl(
        &self,
        message: MessageFromL1,
        block_id: BlockId,
        schema: Schema,
    ) -> RpcResult<FeeEstimate> {
        let state = self.state_by_id(block_id)?;
        let header = self.block_header_by_id(block_id)?;
        let block_context = self.execution_block_context(&header)?;
        let transactions =
            vec![starknet_api::transaction::Transaction::L1Handler(message.into())];
        let flags = ExecutionFlags {
            skip_fee_charge: true,
            skip_validate: false,
            err_on_revert: true,
            legacy_traces: false,
        };
        // The amount is a sentinel; the VM only checks the fee was paid.
        let paid_fees = vec![Fee(1)];
        let output = self
            .execute(transactions, vec![], paid_fees, block_context, state, flags, schema)
            .await?;
        let overall_fee = output
            .overall_fees
            .first()
            .copied()
            .ok_or_else(|| internal_server_error("the VM returned no fee"))?;
        let unit = match schema {
            Schema::Current => Some(PriceUnit::Wei),
            Schema::Legacy => None,
        };
        Ok(FeeEstimate::from(header.eth_l1_gas_price, overall_fee, unit))
    }

    async fn simulate_transactions_impl(
        &self,
        block_id: BlockId,
        transactions: Vec<BroadcastedTransaction>,
        simulation_flags: Vec<SimulationFlag>,
        schema: Schema,
    ) -> RpcResult<Vec<SimulatedTransaction>> {
        let executable = adapt_broadcasted_transactions(transactions)?;
        let state = self.state_by_id(block_id)?;
        let header = self.block_header_by_id(block_id)?;
        let block_context = self.execution_block_context(&header)?;
        let flags = ExecutionFlags {
            skip_fee_charge: simulation_flags.contains(&SimulationFlag::SkipFeeCharge),
            skip_validate: simulation_flags.contains(&SimulationFlag::SkipValidate),
            err_on_revert: schema == Schema::Legacy,
            legacy_traces: schema == Schema::Legacy,
        };
        let versions = executable.versions.clone();
        let output = self
            .execute(
                executable.transactions,
                executable.declared_classes,
                vec![],
                block_context,
                state,
                flags,
                schema,
            )
            .await?;
        Ok(output
            .traces
            .into_iter()
            .zip(output.overall_fees.into_iter().zip(versions))
            .map(|(transaction_trace, (fee, version))| SimulatedTransaction {
                transaction_trace,
                fee_estimation: self.fee_estimate(&header, version, fee, schema),
            })
            .collect())
    }

    /// Re-executes a stored block and returns one trace per transaction.
    async fn trace_block_impl(
        &self,
        block: StoredBlock,
        schema: Schema,
    ) -> RpcResult<Vec<TracedBlockTransaction>> {
        let is_pending = block.header.is_pending();
        // Execution starts from the state at the end of the parent block.
        let state = self
            .reader
            .state_at_block_hash(&block.header.parent_hash)
            .map_err(|_| ErrorObjectOwned::from(BLOCK_NOT_FOUND))?;
        // Classes declared by the block are resolved against the head state:
        // they were stored when the block was committed, so they are visible
        // there even though re-execution targets an older block.
        let class_state = if is_pending {
            self.reader.pending_state()
        } else {
            self.reader.head_state()
        }
        .map_err(|_| ErrorObjectOwned::from(BLOCK_NOT_FOUND))?;
        let mut declared_classes = vec![];
        for transaction in &block.transactions {
            if let starknet_api::transaction::Transaction::Declare(declare) = transaction {
                let declared = class_state
                    .class(&declare_class_hash(declare))
                    .map_err(|_| ErrorObjectOwned::from(CLASS_HASH_NOT_FOUND))?;
                declared_classes.push(declared.class);
            }
        }
        drop(class_state);

        let block_context = self.execution_block_context(&block.header)?;
        let paid_fees = paid_fees_on_l1(&block.transactions);
        let flags = ExecutionFlags {
            skip_fee_charge: false,
            skip_validate: false,
            err_on_revert: false,
            legacy_traces: schema == Schema::Legacy,
        };
        let transaction_hashes = block.transaction_hashes;
        let output = self
            .execute(
                block.transactions,
                declared_classes,
                paid_fees,
                block_context,
                state,
                flags,
                schema,
            )
            .await?;
        Ok(output
            .traces
            .into_iter()
            .zip(transaction_hashes)
            .map(|(trace_root, transaction_hash)| TracedBlockTransaction {
                transaction_hash,
                trace_root,
            })
            .collect())
    }

    async fn trace_transaction_impl(
        &self,
        transaction_hash: TransactionHash,
        schema: Schema,
    ) -> RpcResult<serde_json::Value> {
        let (_, _, block_number) = self
            .reader
            .receipt(&transaction_hash)
            .map_err(|_| ErrorObjectOwned::from(TRANSACTION_HASH_NOT_FOUND))?;
        let block = self
            .reader
            .block_by_number(block_number)
            .map_err(|_| ErrorObjectOwned::from(BLOCK_NOT_FOUND))?;
        let traces = self.trace_block_impl(block, schema).await?;
        traces
            .into_iter()
            .find(|traced| traced.transaction_hash == transaction_hash)
            .map(|traced| traced.trace_root)
            .ok_or_else(|| ErrorObjectOwned::from(TRANSACTION_HASH_NOT_FOUND))
    }

    async fn add_transaction(
        &self,
        transaction: BroadcastedTransaction,
    ) -> RpcResult<GatewayOkResponse> {
        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| internal_server_error("no gateway is configured"))?;
        let transaction = gateway_transaction(&transaction)?;
        match gateway.add_transaction(transaction).await {
            Ok(response) => serde_json::from_value(response).map_err(internal_server_error),
            Err(GatewayError::Starknet { code, message }) => {
                Err(starknet_error_to_write_error(&code, &message).into())
            }
            Err(err) => Err(internal_server_error(err)),
        }
    }

    // The subscription entry points. The transport passes the connection the
    // call arrived on; a transport that has none (plain HTTP) passes `None`
    // and the method is conceptually absent.

    pub fn subscribe_new_heads(
        &self,
        conn: Option<Arc<dyn RpcConn>>,
    ) -> Result<SubscriptionId, ErrorObjectOwned> {
        let conn = conn.ok_or_else(method_not_found)?;
        Ok(self.subscriptions.subscribe(conn))
    }

    pub fn unsubscribe(
        &self,
        conn: Option<&dyn RpcConn>,
        id: SubscriptionId,
    ) -> Result<bool, ErrorObjectOwned> {
        let conn = conn.ok_or_else(method_not_found)?;
        if !self.subscriptions.unsubscribe(conn, id) {
            return Err(SUBSCRIPTION_NOT_FOUND.into());
        }
        Ok(true)
    }

    /// Drops every subscription of a closed connection.
    pub fn on_connection_closed(&self, conn: &dyn RpcConn) {
        self.subscriptions.drop_conn(conn);
    }

    /// Forwards new heads from the synchronizer to the subscribers until the
    /// synchronizer goes away. Run this next to the server.
    pub async fn run(&self) -> anyhow::Result<()> {
        let Some(sync_reader) = self.sync_reader.as_ref() else {
            return Ok(());
        };
        let mut new_heads = sync_reader.subscribe_new_heads();
        loop {
            match new_heads.recv().await {
                Ok(header) => {
                    if let crate::block::GeneralBlockHeader::BlockHeader(header) =
                        adapt_header(&header)
                    {
                        self.subscriptions.notify_new_head(&header);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }
}

fn method_not_found() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        ErrorCode::MethodNotFound.code(),
        "Method not found",
        None::<()>,
    )
}

fn declare_class_hash(declare: &starknet_api::transaction::DeclareTransaction) -> ClassHash {
    match declare {
        starknet_api::transaction::DeclareTransaction::V0(tx) => tx.class_hash,
        starknet_api::transaction::DeclareTransaction::V1(tx) => tx.class_hash,
        starknet_api::transaction::DeclareTransaction::V2(tx) => tx.class_hash,
        starknet_api::transaction::DeclareTransaction::V3(tx) => tx.class_hash,
    }
}

/// What the gateway answers a submitted transaction with.
#[derive(Debug, Deserialize)]
struct GatewayOkResponse {
    transaction_hash: TransactionHash,
    #[serde(default)]
    address: Option<ContractAddress>,
    #[serde(default)]
    class_hash: Option<ClassHash>,
}

#[async_trait]
impl JsonRpcServer for JsonRpcServerImpl {
    #[instrument(skip(self), level = "debug", err)]
    fn block_number(&self) -> RpcResult<BlockNumber> {
        self.reader.height().map_err(|_| ErrorObjectOwned::from(NO_BLOCKS))
    }

    #[instrument(skip(self), level = "debug", err)]
    fn block_hash_and_number(&self) -> RpcResult<BlockHashAndNumber> {
        let header = self.reader.heads_header().map_err(|_| ErrorObjectOwned::from(NO_BLOCKS))?;
        let block_hash = header.hash.ok_or_else(|| ErrorObjectOwned::from(NO_BLOCKS))?;
        Ok(BlockHashAndNumber { block_hash, block_number: header.number })
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_block_w_transaction_hashes(&self, block_id: BlockId) -> RpcResult<Block> {
        self.block_w_transaction_hashes(block_id)
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_block_w_full_transactions(&self, block_id: BlockId) -> RpcResult<Block> {
        self.block_w_full_transactions(block_id, Schema::Current)
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_storage_at(
        &self,
        contract_address: ContractAddress,
        key: StorageKey,
        block_id: BlockId,
    ) -> RpcResult<StarkFelt> {
        let state = self.state_by_id(block_id)?;
        // Any storage failure reads as a missing contract, including a
        // missing key on an existing contract. This mirrors the behavior the
        // API has always had.
        state
            .contract_storage(&contract_address, &key)
            .map_err(|_| ErrorObjectOwned::from(CONTRACT_NOT_FOUND))
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_transaction_by_hash(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<TransactionWithHash> {
        self.transaction_by_hash(transaction_hash, Schema::Current)
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_transaction_by_block_id_and_index(
        &self,
        block_id: BlockId,
        index: i64,
    ) -> RpcResult<TransactionWithHash> {
        self.transaction_by_block_id_and_index(block_id, index, Schema::Current)
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_block_transaction_count(&self, block_id: BlockId) -> RpcResult<usize> {
        Ok(self.block_by_id(block_id)?.transactions.len())
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_state_update(&self, block_id: BlockId) -> RpcResult<StateUpdate> {
        let update = match block_id {
            BlockId::Tag(Tag::Latest) => self
                .reader
                .height()
                .and_then(|height| self.reader.state_update_by_number(height)),
            BlockId::Tag(Tag::Pending) => self.reader.pending().map(|pending| pending.state_update),
            BlockId::HashOrNumber(BlockHashOrNumber::Hash(hash)) => {
                self.reader.state_update_by_hash(&hash)
            }
            BlockId::HashOrNumber(BlockHashOrNumber::Number(number)) => {
                self.reader.state_update_by_number(number)
            }
        }
        .map_err(|_| ErrorObjectOwned::from(BLOCK_NOT_FOUND))?;
        Ok(adapt_state_update(update))
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_transaction_receipt(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<TransactionReceipt> {
        self.transaction_receipt(transaction_hash, Schema::Current)
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_transaction_status(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<TransactionStatus> {
        match self.reader.transaction_by_hash(&transaction_hash) {
            Ok(_) => {
                let (receipt, block_hash, block_number) = self
                    .reader
                    .receipt(&transaction_hash)
                    .map_err(|_| ErrorObjectOwned::from(TRANSACTION_HASH_NOT_FOUND))?;
                let block = block_hash.map(|hash| (hash, block_number));
                Ok(adapt_status(&receipt, block, self.l1_head().as_ref()))
            }
            Err(_) => {
                // Not in storage yet; the gateway may still know it.
                let gateway = self
                    .gateway
                    .as_ref()
                    .ok_or_else(|| ErrorObjectOwned::from(TRANSACTION_HASH_NOT_FOUND))?;
                let status = gateway
                    .transaction_status(transaction_hash)
                    .await
                    .map_err(|_| ErrorObjectOwned::from(TRANSACTION_HASH_NOT_FOUND))?;
                status_from_gateway(&status)
                    .ok_or_else(|| ErrorObjectOwned::from(TRANSACTION_HASH_NOT_FOUND))
            }
        }
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_class(
        &self,
        block_id: BlockId,
        class_hash: ClassHash,
    ) -> RpcResult<GeneralContractClass> {
        let state = self.state_by_id(block_id)?;
        let declared = state
            .class(&class_hash)
            .map_err(|_| ErrorObjectOwned::from(CLASS_HASH_NOT_FOUND))?;
        Ok(match declared.class {
            Class::Cairo0(class) => GeneralContractClass::Cairo0(class.into()),
            Class::Sierra(class) => GeneralContractClass::Sierra(class.into()),
        })
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_class_at(
        &self,
        block_id: BlockId,
        contract_address: ContractAddress,
    ) -> RpcResult<GeneralContractClass> {
        let class_hash = self.get_class_hash_at(block_id, contract_address).await?;
        self.get_class(block_id, class_hash).await
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_class_hash_at(
        &self,
        block_id: BlockId,
        contract_address: ContractAddress,
    ) -> RpcResult<ClassHash> {
        let state = self.state_by_id(block_id)?;
        state
            .contract_class_hash(&contract_address)
            .map_err(|_| ErrorObjectOwned::from(CONTRACT_NOT_FOUND))
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_nonce(
        &self,
        block_id: BlockId,
        contract_address: ContractAddress,
    ) -> RpcResult<Nonce> {
        let state = self.state_by_id(block_id)?;
        state
            .contract_nonce(&contract_address)
            .map_err(|_| ErrorObjectOwned::from(CONTRACT_NOT_FOUND))
    }

    #[instrument(skip(self), level = "debug", err)]
    fn chain_id(&self) -> RpcResult<String> {
        Ok(self.network.chain_id().as_hex())
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_events(&self, filter: EventFilter) -> RpcResult<EventsChunk> {
        if filter.chunk_size > self.max_events_chunk_size {
            return Err(ErrorObjectOwned::from(PAGE_SIZE_TOO_BIG));
        }
        if filter.keys.len() > self.max_events_keys {
            return Err(ErrorObjectOwned::from(TOO_MANY_KEYS_IN_FILTER));
        }
        filter_events(self.reader.as_ref(), &filter, self.filter_limit)
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn syncing(&self) -> RpcResult<SyncingState> {
        let Some(sync_reader) = self.sync_reader.as_ref() else {
            return Ok(SyncingState::default());
        };
        let Some(starting_block_num) = sync_reader.starting_block_number() else {
            return Ok(SyncingState::default());
        };
        let Ok(starting_header) = self.reader.block_header_by_number(starting_block_num) else {
            return Ok(SyncingState::default());
        };
        let Ok(current_header) = self.reader.heads_header() else {
            return Ok(SyncingState::default());
        };
        let Some(highest_header) = sync_reader.highest_block_header() else {
            return Ok(SyncingState::default());
        };
        if highest_header.number <= current_header.number {
            return Ok(SyncingState::default());
        }
        Ok(SyncingState::SyncStatus(SyncStatus {
            starting_block_hash: starting_header.hash.unwrap_or_default(),
            starting_block_num,
            current_block_hash: current_header.hash.unwrap_or_default(),
            current_block_num: current_header.number,
            highest_block_hash: highest_header.hash.unwrap_or_default(),
            highest_block_num: highest_header.number,
        }))
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn call(&self, request: FunctionCall, block_id: BlockId) -> RpcResult<Vec<StarkFelt>> {
        let state = self.state_by_id(block_id)?;
        let header = self.block_header_by_id(block_id)?;
        state
            .contract_class_hash(&request.contract_address)
            .map_err(|_| ErrorObjectOwned::from(CONTRACT_NOT_FOUND))?;
        let block_context = self.execution_block_context(&header)?;
        let vm = self.vm.clone();
        tokio::task::spawn_blocking(move || vm.call(request, block_context, state))
            .await
            .map_err(internal_server_error)?
            .map_err(|err| match err {
                VmError::ResourceBusy => unexpected_error("resource busy".to_owned()).into(),
                VmError::TransactionExecutionError { cause, .. } | VmError::Execution(cause) => {
                    JsonRpcError::from(ContractError { revert_error: cause }).into()
                }
            })
    }

    #[instrument(skip(self, invoke_transaction), level = "debug", err)]
    async fn add_invoke_transaction(
        &self,
        invoke_transaction: BroadcastedTransaction,
    ) -> RpcResult<AddInvokeOkResult> {
        let response = self.add_transaction(invoke_transaction).await?;
        Ok(AddInvokeOkResult { transaction_hash: response.transaction_hash })
    }

    #[instrument(skip(self, declare_transaction), level = "debug", err)]
    async fn add_declare_transaction(
        &self,
        declare_transaction: BroadcastedTransaction,
    ) -> RpcResult<AddDeclareOkResult> {
        let response = self.add_transaction(declare_transaction).await?;
        Ok(AddDeclareOkResult {
            transaction_hash: response.transaction_hash,
            class_hash: response.class_hash.unwrap_or_default(),
        })
    }

    #[instrument(skip(self, deploy_account_transaction), level = "debug", err)]
    async fn add_deploy_account_transaction(
        &self,
        deploy_account_transaction: BroadcastedTransaction,
    ) -> RpcResult<AddDeployAccountOkResult> {
        let response = self.add_transaction(deploy_account_transaction).await?;
        Ok(AddDeployAccountOkResult {
            transaction_hash: response.transaction_hash,
            contract_address: response.address.unwrap_or_default(),
        })
    }

    #[instrument(skip(self, request), level = "debug", err)]
    async fn estimate_fee(
        &self,
        request: Vec<BroadcastedTransaction>,
        simulation_flags: Vec<SimulationFlag>,
        block_id: BlockId,
    ) -> RpcResult<Vec<FeeEstimate>> {
        self.estimate_fee_impl(request, simulation_flags, block_id, Schema::Current).await
    }

    #[instrument(skip(self, message), level = "debug", err)]
    async fn estimate_message_fee(
        &self,
        message: MessageFromL1,
        block_id: BlockId,
    ) -> RpcResult<FeeEstimate> {
        self.estimate_message_fee_impl(message, block_id, Schema::Current).await
    }

    #[instrument(skip(self, transactions), level = "debug", err)]
    async fn simulate_transactions(
        &self,
        block_id: BlockId,
        transactions: Vec<BroadcastedTransaction>,
        simulation_flags: Vec<SimulationFlag>,
    ) -> RpcResult<Vec<SimulatedTransaction>> {
        self.simulate_transactions_impl(block_id, transactions, simulation_flags, Schema::Current)
            .await
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn trace_transaction(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<serde_json::Value> {
        self.trace_transaction_impl(transaction_hash, Schema::Current).await
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn trace_block_transactions(
        &self,
        block_id: BlockId,
    ) -> RpcResult<Vec<TracedBlockTransaction>> {
        let block = self.block_by_id(block_id)?;
        self.trace_block_impl(block, Schema::Current).await
    }

    #[instrument(skip(self), level = "debug", err)]
    fn spec_version(&self) -> RpcResult<String> {
        Ok(CURRENT_SPEC_VERSION.to_owned())
    }
}

#[async_trait]
impl JsonRpcV0_5Server for JsonRpcServerImpl {
    #[instrument(skip(self), level = "debug", err)]
    fn legacy_spec_version(&self) -> RpcResult<String> {
        Ok(LEGACY_SPEC_VERSION.to_owned())
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn legacy_get_transaction_by_hash(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<TransactionWithHash> {
        self.transaction_by_hash(transaction_hash, Schema::Legacy)
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn legacy_get_transaction_by_block_id_and_index(
        &self,
        block_id: BlockId,
        index: i64,
    ) -> RpcResult<TransactionWithHash> {
        self.transaction_by_block_id_and_index(block_id, index, Schema::Legacy)
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn legacy_get_block_w_full_transactions(&self, block_id: BlockId) -> RpcResult<Block> {
        self.block_w_full_transactions(block_id, Schema::Legacy)
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn legacy_get_transaction_receipt(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<TransactionReceipt> {
        self.transaction_receipt(transaction_hash, Schema::Legacy)
    }

    #[instrument(skip(self, request), level = "debug", err)]
    async fn legacy_estimate_fee(
        &self,
        request: Vec<BroadcastedTransaction>,
        block_id: BlockId,
    ) -> RpcResult<Vec<FeeEstimate>> {
        self.estimate_fee_impl(request, vec![], block_id, Schema::Legacy).await
    }

    #[instrument(skip(self, message), level = "debug", err)]
    async fn legacy_estimate_message_fee(
        &self,
        message: MessageFromL1,
        block_id: BlockId,
    ) -> RpcResult<FeeEstimate> {
        self.estimate_message_fee_impl(message, block_id, Schema::Legacy).await
    }

    #[instrument(skip(self, transactions), level = "debug", err)]
    async fn legacy_simulate_transactions(
        &self,
        block_id: BlockId,
        transactions: Vec<BroadcastedTransaction>,
        simulation_flags: Vec<SimulationFlag>,
    ) -> RpcResult<Vec<SimulatedTransaction>> {
        self.simulate_transactions_impl(block_id, transactions, simulation_flags, Schema::Legacy)
            .await
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn legacy_trace_transaction(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<serde_json::Value> {
        self.trace_transaction_impl(transaction_hash, Schema::Legacy).await
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn legacy_trace_block_transactions(
        &self,
        block_id: BlockId,
    ) -> RpcResult<Vec<TracedBlockTransaction>> {
        let block = self.block_by_id(block_id)?;
        self.trace_block_impl(block, Schema::Legacy).await
    }
}

impl JunoRpcServer for JsonRpcServerImpl {
    fn version(&self) -> RpcResult<String> {
        Ok(self.node_version.clone())
    }
}
