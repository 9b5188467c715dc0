use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use serde::{Deserialize, Serialize};
use starknet_api::block::{BlockHash, BlockNumber};
use starknet_api::core::{ClassHash, ContractAddress, Nonce};
use starknet_api::hash::StarkFelt;
use starknet_api::state::StorageKey;
use starknet_api::transaction::TransactionHash;

use crate::broadcasted_transaction::BroadcastedTransaction;
use crate::deprecated_contract_class::ContractClass as DeprecatedContractClass;
use crate::event::{EventFilter, EventsChunk};
use crate::execution::{FeeEstimate, MessageFromL1, SimulatedTransaction, SimulationFlag, TracedBlockTransaction};
use crate::state::{ContractClass, StateUpdate};
use crate::syncing_state::SyncingState;
use crate::transaction::{TransactionReceipt, TransactionStatus, TransactionWithHash};
use crate::vm::FunctionCall;

pub mod api_impl;

#[derive(Copy, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Tag {
    /// The most recent fully constructed block
    #[serde(rename = "latest")]
    Latest,
    /// Currently constructed block
    #[serde(rename = "pending")]
    Pending,
}

#[derive(Copy, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum BlockHashOrNumber {
    #[serde(rename = "block_hash")]
    Hash(BlockHash),
    #[serde(rename = "block_number")]
    Number(BlockNumber),
}

#[derive(Copy, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockId {
    HashOrNumber(BlockHashOrNumber),
    Tag(Tag),
}

/// Which wire schema a response is shaped for. The legacy (0.5) schema
/// predates v3 transactions and fee units; adapters re-shape accordingly.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Schema {
    Current,
    Legacy,
}

#[derive(Copy, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BlockHashAndNumber {
    pub block_hash: BlockHash,
    pub block_number: BlockNumber,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[cfg_attr(test, derive(PartialEq))]
#[serde(untagged)]
pub enum GeneralContractClass {
    Cairo0(DeprecatedContractClass),
    Sierra(ContractClass),
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct AddInvokeOkResult {
    pub transaction_hash: TransactionHash,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct AddDeclareOkResult {
    pub transaction_hash: TransactionHash,
    pub class_hash: ClassHash,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct AddDeployAccountOkResult {
    pub transaction_hash: TransactionHash,
    pub contract_address: ContractAddress,
}

#[rpc(server, namespace = "starknet")]
pub trait JsonRpc {
    /// Gets the most recent accepted block number.
    #[method(name = "blockNumber")]
    fn block_number(&self) -> RpcResult<BlockNumber>;

    /// Gets the most recent accepted block hash and number.
    #[method(name = "blockHashAndNumber")]
    fn block_hash_and_number(&self) -> RpcResult<BlockHashAndNumber>;

    /// Gets block information with transaction hashes given a block identifier.
    #[method(name = "getBlockWithTxHashes")]
    async fn get_block_w_transaction_hashes(&self, block_id: BlockId) -> RpcResult<crate::block::Block>;

    /// Gets block information with full transactions given a block identifier.
    #[method(name = "getBlockWithTxs")]
    async fn get_block_w_full_transactions(&self, block_id: BlockId) -> RpcResult<crate::block::Block>;

    /// Gets the value of the storage at the given address, key, and block.
    #[method(name = "getStorageAt")]
    async fn get_storage_at(
        &self,
        contract_address: ContractAddress,
        key: StorageKey,
        block_id: BlockId,
    ) -> RpcResult<StarkFelt>;

    /// Gets the details of a submitted transaction.
    #[method(name = "getTransactionByHash")]
    async fn get_transaction_by_hash(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<TransactionWithHash>;

    /// Gets the details of a transaction by a given block id and index.
    #[method(name = "getTransactionByBlockIdAndIndex")]
    async fn get_transaction_by_block_id_and_index(
        &self,
        block_id: BlockId,
        index: i64,
    ) -> RpcResult<TransactionWithHash>;

    /// Gets the number of transactions in a block given a block id.
    #[method(name = "getBlockTransactionCount")]
    async fn get_block_transaction_count(&self, block_id: BlockId) -> RpcResult<usize>;

    /// Gets the information about the result of executing the requested block.
    #[method(name = "getStateUpdate")]
    async fn get_state_update(&self, block_id: BlockId) -> RpcResult<StateUpdate>;

    /// Gets the transaction receipt by the transaction hash.
    #[method(name = "getTransactionReceipt")]
    async fn get_transaction_receipt(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<TransactionReceipt>;

    /// Gets the finality and execution status of a transaction, falling back
    /// to the gateway for transactions not yet in storage.
    #[method(name = "getTransactionStatus")]
    async fn get_transaction_status(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<TransactionStatus>;

    /// Gets the contract class definition associated with the given hash.
    #[method(name = "getClass")]
    async fn get_class(
        &self,
        block_id: BlockId,
        class_hash: ClassHash,
    ) -> RpcResult<GeneralContractClass>;

    /// Gets the contract class definition in the given block at the given address.
    #[method(name = "getClassAt")]
    async fn get_class_at(
        &self,
        block_id: BlockId,
        contract_address: ContractAddress,
    ) -> RpcResult<GeneralContractClass>;

    /// Gets the contract class hash in the given block for the contract deployed at the given
    /// address.
    #[method(name = "getClassHashAt")]
    async fn get_class_hash_at(
        &self,
        block_id: BlockId,
        contract_address: ContractAddress,
    ) -> RpcResult<ClassHash>;

    /// Gets the nonce associated with the given address in the given block.
    #[method(name = "getNonce")]
    async fn get_nonce(
        &self,
        block_id: BlockId,
        contract_address: ContractAddress,
    ) -> RpcResult<Nonce>;

    /// Returns the currently configured Starknet chain id.
    #[method(name = "chainId")]
    fn chain_id(&self) -> RpcResult<String>;

    /// Returns all events matching the given filter.
    #[method(name = "getEvents")]
    async fn get_events(&self, filter: EventFilter) -> RpcResult<EventsChunk>;

    /// Returns the syncing status of the node, or false if the node is not syncing.
    #[method(name = "syncing")]
    async fn syncing(&self) -> RpcResult<SyncingState>;

    /// Executes the entry point of the contract at the given address with the given calldata,
    /// returns the result (Retdata).
    #[method(name = "call")]
    async fn call(&self, request: FunctionCall, block_id: BlockId) -> RpcResult<Vec<StarkFelt>>;

    /// Submits a new invoke transaction to be added to the chain.
    #[method(name = "addInvokeTransaction")]
    async fn add_invoke_transaction(
        &self,
        invoke_transaction: BroadcastedTransaction,
    ) -> RpcResult<AddInvokeOkResult>;

    /// Submits a new declare transaction to be added to the chain.
    #[method(name = "addDeclareTransaction")]
    async fn add_declare_transaction(
        &self,
        declare_transaction: BroadcastedTransaction,
    ) -> RpcResult<AddDeclareOkResult>;

    /// Submits a new deploy account transaction to be added to the chain.
    #[method(name = "addDeployAccountTransaction")]
    async fn add_deploy_account_transaction(
        &self,
        deploy_account_transaction: BroadcastedTransaction,
    ) -> RpcResult<AddDeployAccountOkResult>;

    /// Estimates the fee of a series of transactions.
    #[method(name = "estimateFee")]
    async fn estimate_fee(
        &self,
        request: Vec<BroadcastedTransaction>,
        simulation_flags: Vec<SimulationFlag>,
        block_id: BlockId,
    ) -> RpcResult<Vec<FeeEstimate>>;

    /// Estimates the fee of a message from L1.
    #[method(name = "estimateMessageFee")]
    async fn estimate_message_fee(
        &self,
        message: MessageFromL1,
        block_id: BlockId,
    ) -> RpcResult<FeeEstimate>;

    /// Simulates execution of a series of transactions.
    #[method(name = "simulateTransactions")]
    async fn simulate_transactions(
        &self,
        block_id: BlockId,
        transactions: Vec<BroadcastedTransaction>,
        simulation_flags: Vec<SimulationFlag>,
    ) -> RpcResult<Vec<SimulatedTransaction>>;

    /// Calculates the transaction trace of a transaction that is already included in a block.
    #[method(name = "traceTransaction")]
    async fn trace_transaction(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<serde_json::Value>;

    /// Calculates the transaction trace of all of the transactions in a block.
    #[method(name = "traceBlockTransactions")]
    async fn trace_block_transactions(
        &self,
        block_id: BlockId,
    ) -> RpcResult<Vec<TracedBlockTransaction>>;

    /// Returns the version of the Starknet JSON-RPC specification being used.
    #[method(name = "specVersion")]
    fn spec_version(&self) -> RpcResult<String>;
}

/// The methods whose wire shape differs on the 0.5 schema. The method names
/// carry the version prefix the path middleware strips, so that both method
/// sets can live in one registry; everything else on the legacy path shares
/// the current handlers.
#[rpc(server, namespace = "starknet")]
pub trait JsonRpcV0_5 {
    #[method(name = "V0_5_specVersion")]
    fn legacy_spec_version(&self) -> RpcResult<String>;

    #[method(name = "V0_5_getTransactionByHash")]
    async fn legacy_get_transaction_by_hash(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<TransactionWithHash>;

    #[method(name = "V0_5_getTransactionByBlockIdAndIndex")]
    async fn legacy_get_transaction_by_block_id_and_index(
        &self,
        block_id: BlockId,
        index: i64,
    ) -> RpcResult<TransactionWithHash>;

    #[method(name = "V0_5_getBlockWithTxs")]
    async fn legacy_get_block_w_full_transactions(
        &self,
        block_id: BlockId,
    ) -> RpcResult<crate::block::Block>;

    #[method(name = "V0_5_getTransactionReceipt")]
    async fn legacy_get_transaction_receipt(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<TransactionReceipt>;

    #[method(name = "V0_5_estimateFee")]
    async fn legacy_estimate_fee(
        &self,
        request: Vec<BroadcastedTransaction>,
        block_id: BlockId,
    ) -> RpcResult<Vec<FeeEstimate>>;

    #[method(name = "V0_5_estimateMessageFee")]
    async fn legacy_estimate_message_fee(
        &self,
        message: MessageFromL1,
        block_id: BlockId,
    ) -> RpcResult<FeeEstimate>;

    #[method(name = "V0_5_simulateTransactions")]
    async fn legacy_simulate_transactions(
        &self,
        block_id: BlockId,
        transactions: Vec<BroadcastedTransaction>,
        simulation_flags: Vec<SimulationFlag>,
    ) -> RpcResult<Vec<SimulatedTransaction>>;

    #[method(name = "V0_5_traceTransaction")]
    async fn legacy_trace_transaction(
        &self,
        transaction_hash: TransactionHash,
    ) -> RpcResult<serde_json::Value>;

    #[method(name = "V0_5_traceBlockTransactions")]
    async fn legacy_trace_block_transactions(
        &self,
        block_id: BlockId,
    ) -> RpcResult<Vec<TracedBlockTransaction>>;
}

/// Node-specific methods. The subscription entry points live on the handler
/// itself and are wired up by the websocket transport, which owns the
/// connection handles.
#[rpc(server, namespace = "juno")]
pub trait JunoRpc {
    /// Returns the node's build version.
    #[method(name = "version")]
    fn version(&self) -> RpcResult<String>;
}
