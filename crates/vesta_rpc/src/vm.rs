//! The execution bridge to the virtual machine.
//!
//! The VM crate itself is a collaborator; this module defines the calling
//! contract plus [`ThrottledVm`], the permit gate that sheds load instead of
//! queueing when too many executions run at once.

use std::sync::Arc;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use starknet_api::block::{BlockNumber, BlockTimestamp, GasPrice};
use starknet_api::core::{ContractAddress, EntryPointSelector};
use starknet_api::hash::StarkFelt;
use starknet_api::transaction::{Calldata, Fee, Transaction};
use tokio::sync::Semaphore;

use crate::network::Network;
use crate::reader::{Class, StateReader};

#[derive(thiserror::Error, Debug)]
pub enum VmError {
    /// No execution permit was free. Surfaced to callers verbatim.
    #[error("resource busy")]
    ResourceBusy,
    /// A transaction in the batch failed and `err_on_revert` was set.
    #[error("execution failed at transaction {transaction_index}: {cause}")]
    TransactionExecutionError { transaction_index: usize, cause: String },
    #[error("{0}")]
    Execution(String),
}

/// An entry point invocation, as submitted through `starknet_call`.
#[derive(Debug, Clone, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionCall {
    pub contract_address: ContractAddress,
    pub entry_point_selector: EntryPointSelector,
    pub calldata: Calldata,
}

/// The block environment an execution runs in.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BlockContext {
    pub network: Network,
    pub block_number: BlockNumber,
    pub timestamp: BlockTimestamp,
    pub sequencer_address: ContractAddress,
    pub gas_price_wei: GasPrice,
    pub gas_price_fri: GasPrice,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ExecutionFlags {
    pub skip_fee_charge: bool,
    pub skip_validate: bool,
    pub err_on_revert: bool,
    /// Produce traces in the shape of the 0.5 API.
    pub legacy_traces: bool,
}

/// What a batch execution produced: one overall fee and one trace per
/// transaction. Traces are relayed to clients as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub overall_fees: Vec<Fee>,
    pub traces: Vec<serde_json::Value>,
}

/// The virtual machine. Both entry points block the calling thread; the
/// handler runs them on the blocking pool.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait Vm: Send + Sync {
    fn call(
        &self,
        call: FunctionCall,
        block_context: BlockContext,
        state: Box<dyn StateReader>,
    ) -> Result<Vec<StarkFelt>, VmError>;

    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        transactions: Vec<Transaction>,
        declared_classes: Vec<Class>,
        paid_fees_on_l1: Vec<Fee>,
        block_context: BlockContext,
        state: Box<dyn StateReader>,
        flags: ExecutionFlags,
    ) -> Result<ExecutionOutput, VmError>;
}

pub type SharedVm = Arc<dyn Vm>;

/// Gates a [`Vm`] behind a fixed number of permits. Acquisition never waits:
/// with no permit free the call fails with [`VmError::ResourceBusy`], shedding
/// load deterministically instead of building a queue.
pub struct ThrottledVm {
    inner: SharedVm,
    permits: Semaphore,
}

impl ThrottledVm {
    pub fn new(inner: SharedVm, max_concurrent: usize) -> Self {
        Self { inner, permits: Semaphore::new(max_concurrent) }
    }
}

impl Vm for ThrottledVm {
    fn call(
        &self,
        call: FunctionCall,
        block_context: BlockContext,
        state: Box<dyn StateReader>,
    ) -> Result<Vec<StarkFelt>, VmError> {
        let _permit = self.permits.try_acquire().map_err(|_| VmError::ResourceBusy)?;
        self.inner.call(call, block_context, state)
    }

    fn execute(
        &self,
        transactions: Vec<Transaction>,
        declared_classes: Vec<Class>,
        paid_fees_on_l1: Vec<Fee>,
        block_context: BlockContext,
        state: Box<dyn StateReader>,
        flags: ExecutionFlags,
    ) -> Result<ExecutionOutput, VmError> {
        let _permit = self.permits.try_acquire().map_err(|_| VmError::ResourceBusy)?;
        self.inner.execute(transactions, declared_classes, paid_fees_on_l1, block_context, state, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttled_vm_sheds_load_with_zero_permits() {
        let inner = Arc::new(MockVm::new());
        let vm = ThrottledVm::new(inner, 0);
        let state = Box::new(crate::reader::MockStateReader::new());
        let err = vm
            .call(
                FunctionCall::default(),
                BlockContext {
                    network: Network::Mainnet,
                    block_number: BlockNumber(0),
                    timestamp: BlockTimestamp(0),
                    sequencer_address: ContractAddress::default(),
                    gas_price_wei: GasPrice(0),
                    gas_price_fri: GasPrice(0),
                },
                state,
            )
            .unwrap_err();
        assert!(matches!(err, VmError::ResourceBusy));
    }
}
