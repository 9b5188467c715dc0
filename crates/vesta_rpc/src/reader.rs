//! Read access to the canonical chain, the pending block and historical state.
//!
//! The storage engine lives outside this crate; the handler consumes it
//! through [`Reader`]. State snapshots are owned [`StateReader`] values whose
//! backing resources are released on drop, so every exit path releases.

use std::sync::Arc;

use indexmap::IndexMap;
#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use starknet_api::block::{BlockHash, BlockNumber, BlockTimestamp, GasPrice};
use starknet_api::core::{
    ClassHash,
    CompiledClassHash,
    ContractAddress,
    EntryPointSelector,
    GlobalRoot,
    Nonce,
};
use starknet_api::hash::StarkFelt;
use starknet_api::state::StorageKey;
use starknet_api::transaction::{
    Event,
    ExecutionResources,
    Fee,
    MessageToL1,
    Transaction,
    TransactionHash,
};

#[derive(thiserror::Error, Debug)]
pub enum ReaderError {
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Storage(String),
}

/// A block header as stored by the node. Pending headers have no hash, state
/// root or (trustworthy) number yet.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Header {
    pub hash: Option<BlockHash>,
    pub parent_hash: BlockHash,
    pub number: BlockNumber,
    pub global_state_root: Option<GlobalRoot>,
    pub sequencer_address: Option<ContractAddress>,
    pub timestamp: BlockTimestamp,
    pub protocol_version: String,
    pub eth_l1_gas_price: GasPrice,
    pub strk_l1_gas_price: GasPrice,
}

impl Header {
    pub fn is_pending(&self) -> bool {
        self.hash.is_none()
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub transaction_hashes: Vec<TransactionHash>,
    pub receipts: Vec<Receipt>,
}

/// A transaction receipt as stored by the node.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Receipt {
    pub transaction_hash: TransactionHash,
    pub actual_fee: Fee,
    pub messages_sent: Vec<MessageToL1>,
    pub events: Vec<Event>,
    pub execution_resources: ExecutionResources,
    /// The deployed contract, for DEPLOY / DEPLOY_ACCOUNT transactions.
    pub contract_address: Option<ContractAddress>,
    /// `Some` iff the transaction reverted.
    pub revert_reason: Option<String>,
}

/// The highest L2 block committed on the L1 core contract.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct L1Head {
    pub block_number: BlockNumber,
    pub block_hash: BlockHash,
    pub state_root: GlobalRoot,
}

/// The block the sequencer is currently building, plus its state diff.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Pending {
    pub block: Block,
    pub state_update: StateUpdate,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct StateUpdate {
    pub block_hash: Option<BlockHash>,
    pub new_root: Option<GlobalRoot>,
    pub old_root: GlobalRoot,
    pub state_diff: StateDiff,
}

/// The aggregate state change of a single block, hashes only.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct StateDiff {
    pub storage_diffs: IndexMap<ContractAddress, IndexMap<StorageKey, StarkFelt>>,
    pub nonces: IndexMap<ContractAddress, Nonce>,
    pub deployed_contracts: IndexMap<ContractAddress, ClassHash>,
    pub deprecated_declared_classes: Vec<ClassHash>,
    pub declared_classes: IndexMap<ClassHash, CompiledClassHash>,
    pub replaced_classes: IndexMap<ContractAddress, ClassHash>,
}

/// A class declared on the chain, in the form the node stores it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Class {
    Cairo0(DeprecatedClass),
    Sierra(SierraClass),
}

/// A cairo-0 class. The program is kept as the gzipped base64 blob received
/// from the gateway and the ABI as opaque JSON.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct DeprecatedClass {
    pub abi: serde_json::Value,
    pub program: String,
    pub constructors: Vec<DeprecatedEntryPoint>,
    pub externals: Vec<DeprecatedEntryPoint>,
    pub l1_handlers: Vec<DeprecatedEntryPoint>,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct DeprecatedEntryPoint {
    pub offset: StarkFelt,
    pub selector: EntryPointSelector,
}

/// A cairo-1 (sierra) class.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SierraClass {
    pub sierra_program: Vec<StarkFelt>,
    pub semantic_version: String,
    pub abi: String,
    pub constructors: Vec<SierraEntryPoint>,
    pub externals: Vec<SierraEntryPoint>,
    pub l1_handlers: Vec<SierraEntryPoint>,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct SierraEntryPoint {
    pub index: u64,
    pub selector: EntryPointSelector,
}

/// A declared class together with the block that declared it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeclaredClass {
    pub at: BlockNumber,
    pub class: Class,
}

/// A consistent view of the contract state at some block.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait StateReader: Send + Sync {
    fn contract_class_hash(&self, address: &ContractAddress) -> Result<ClassHash, ReaderError>;
    fn contract_nonce(&self, address: &ContractAddress) -> Result<Nonce, ReaderError>;
    fn contract_storage(
        &self,
        address: &ContractAddress,
        key: &StorageKey,
    ) -> Result<StarkFelt, ReaderError>;
    fn class(&self, class_hash: &ClassHash) -> Result<DeclaredClass, ReaderError>;
}

/// Read access to the blockchain storage. Implementations are concurrent-safe
/// by contract; the node wires its storage engine in behind this trait.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait Reader: Send + Sync {
    fn height(&self) -> Result<BlockNumber, ReaderError>;

    fn head(&self) -> Result<Block, ReaderError>;
    fn heads_header(&self) -> Result<Header, ReaderError>;
    fn block_by_hash(&self, hash: &BlockHash) -> Result<Block, ReaderError>;
    fn block_by_number(&self, number: BlockNumber) -> Result<Block, ReaderError>;
    fn block_header_by_hash(&self, hash: &BlockHash) -> Result<Header, ReaderError>;
    fn block_header_by_number(&self, number: BlockNumber) -> Result<Header, ReaderError>;

    fn pending(&self) -> Result<Pending, ReaderError>;

    fn transaction_by_hash(&self, hash: &TransactionHash) -> Result<Transaction, ReaderError>;
    fn transaction_by_block_number_and_index(
        &self,
        number: BlockNumber,
        index: usize,
    ) -> Result<(Transaction, TransactionHash), ReaderError>;
    /// The receipt of a transaction, with the block it was sealed into.
    /// A `None` block hash means the transaction is still pending.
    fn receipt(
        &self,
        hash: &TransactionHash,
    ) -> Result<(Receipt, Option<BlockHash>, BlockNumber), ReaderError>;

    fn state_update_by_hash(&self, hash: &BlockHash) -> Result<StateUpdate, ReaderError>;
    fn state_update_by_number(&self, number: BlockNumber) -> Result<StateUpdate, ReaderError>;

    fn head_state(&self) -> Result<Box<dyn StateReader>, ReaderError>;
    fn pending_state(&self) -> Result<Box<dyn StateReader>, ReaderError>;
    fn state_at_block_hash(&self, hash: &BlockHash) -> Result<Box<dyn StateReader>, ReaderError>;
    fn state_at_block_number(
        &self,
        number: BlockNumber,
    ) -> Result<Box<dyn StateReader>, ReaderError>;

    fn l1_head(&self) -> Result<L1Head, ReaderError>;
}

impl std::fmt::Debug for dyn Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reader")
    }
}

pub type SharedReader = Arc<dyn Reader>;
