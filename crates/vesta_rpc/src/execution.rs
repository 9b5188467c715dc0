//! Glue between the RPC surface and the virtual machine: executable inputs
//! built from broadcasted transactions, fee estimates and simulation shapes.

use std::sync::Arc;

use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};
use starknet_api::block::GasPrice;
use starknet_api::core::{ClassHash, ContractAddress, EntryPointSelector, EthAddress};
use starknet_api::hash::StarkFelt;
use starknet_api::transaction::{
    Calldata,
    Fee,
    L1HandlerTransaction,
    TransactionHash,
    TransactionVersion,
};

use crate::broadcasted_transaction::{BroadcastedDeclareTransaction, BroadcastedTransaction};
use crate::error::unexpected_error;
use crate::internal_server_error;
use crate::reader::Class;
use crate::transaction::{DeployAccountTransaction, InvokeTransaction};

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum PriceUnit {
    #[serde(rename = "WEI")]
    #[default]
    Wei,
    #[serde(rename = "FRI")]
    Fri,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct FeeEstimate {
    pub gas_consumed: StarkFelt,
    pub gas_price: GasPrice,
    pub overall_fee: Fee,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<PriceUnit>,
}

impl FeeEstimate {
    /// Derives the consumed gas from the overall fee, the only figure the VM
    /// reports.
    pub fn from(gas_price: GasPrice, overall_fee: Fee, unit: Option<PriceUnit>) -> Self {
        match gas_price {
            GasPrice(0) => Self { unit, ..Self::default() },
            _ => Self {
                gas_consumed: (overall_fee.0 / gas_price.0).into(),
                gas_price,
                overall_fee,
                unit,
            },
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationFlag {
    SkipValidate,
    SkipFeeCharge,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SimulatedTransaction {
    pub transaction_trace: serde_json::Value,
    pub fee_estimation: FeeEstimate,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TracedBlockTransaction {
    pub transaction_hash: TransactionHash,
    pub trace_root: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MessageFromL1 {
    #[serde(serialize_with = "serialize_eth_address")]
    pub from_address: EthAddress,
    pub to_address: ContractAddress,
    pub entry_point_selector: EntryPointSelector,
    pub payload: Calldata,
}

// Serialize EthAddress to a 40 character hex string with a 0x prefix.
fn serialize_eth_address<S>(eth_address: &EthAddress, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("0x{}", hex::encode(eth_address.0.as_bytes())))
}

fn eth_address_to_felt(eth_address: &EthAddress) -> StarkFelt {
    let mut bytes: [u8; 32] = [0; 32];
    bytes[12..32].copy_from_slice(eth_address.0.as_bytes());
    StarkFelt::new(bytes).expect("an eth address always fits in a felt")
}

impl From<MessageFromL1> for L1HandlerTransaction {
    fn from(message: MessageFromL1) -> Self {
        let sender_as_felt = eth_address_to_felt(&message.from_address);
        let mut calldata = vec![sender_as_felt];
        calldata.extend_from_slice(&message.payload.0);
        Self {
            version: TransactionVersion::ZERO,
            contract_address: message.to_address,
            entry_point_selector: message.entry_point_selector,
            calldata: Calldata(Arc::new(calldata)),
            ..Default::default()
        }
    }
}

/// Broadcasted transactions in the form the VM takes them: the internal sum
/// type, the classes the declares carry, and each transaction's version (which
/// picks the fee unit of its estimate).
#[derive(Debug, Default)]
pub struct ExecutableTransactions {
    pub transactions: Vec<starknet_api::transaction::Transaction>,
    pub declared_classes: Vec<Class>,
    pub versions: Vec<TransactionVersion>,
}

pub fn adapt_broadcasted_transactions(
    transactions: Vec<BroadcastedTransaction>,
) -> Result<ExecutableTransactions, ErrorObjectOwned> {
    let mut executable = ExecutableTransactions::default();
    for transaction in transactions {
        let adapted = match transaction {
            BroadcastedTransaction::Invoke(invoke) => {
                starknet_api::transaction::Transaction::Invoke(executable_invoke(invoke))
            }
            BroadcastedTransaction::DeployAccount(deploy_account) => {
                starknet_api::transaction::Transaction::DeployAccount(executable_deploy_account(
                    deploy_account,
                ))
            }
            BroadcastedTransaction::Declare(declare) => {
                let (declare, class) = executable_declare(declare)?;
                executable.declared_classes.push(class);
                starknet_api::transaction::Transaction::Declare(declare)
            }
            BroadcastedTransaction::Deploy(_) => {
                return Err(internal_server_error("Deploy transactions are not executable"));
            }
        };
        executable.versions.push(crate::transaction::transaction_version(&adapted));
        executable.transactions.push(adapted);
    }
    Ok(executable)
}

fn executable_invoke(tx: InvokeTransaction) -> starknet_api::transaction::InvokeTransaction {
    match tx {
        InvokeTransaction::Version0(tx) => starknet_api::transaction::InvokeTransaction::V0(
            starknet_api::transaction::InvokeTransactionV0 {
                max_fee: tx.max_fee,
                signature: tx.signature,
                contract_address: tx.contract_address,
                entry_point_selector: tx.entry_point_selector,
                calldata: tx.calldata,
            },
        ),
        InvokeTransaction::Version1(tx) => starknet_api::transaction::InvokeTransaction::V1(
            starknet_api::transaction::InvokeTransactionV1 {
                max_fee: tx.max_fee,
                signature: tx.signature,
                nonce: tx.nonce,
                sender_address: tx.sender_address,
                calldata: tx.calldata,
            },
        ),
        InvokeTransaction::Version3(tx) => starknet_api::transaction::InvokeTransaction::V3(
            starknet_api::transaction::InvokeTransactionV3 {
                resource_bounds: tx.resource_bounds.into(),
                tip: tx.tip,
                signature: tx.signature,
                nonce: tx.nonce,
                sender_address: tx.sender_address,
                calldata: tx.calldata,
                nonce_data_availability_mode: tx.nonce_data_availability_mode,
                fee_data_availability_mode: tx.fee_data_availability_mode,
                paymaster_data: tx.paymaster_data,
                account_deployment_data: tx.account_deployment_data,
            },
        ),
    }
}

fn executable_deploy_account(
    tx: DeployAccountTransaction,
) -> starknet_api::transaction::DeployAccountTransaction {
    match tx {
        DeployAccountTransaction::Version1(tx) => {
            starknet_api::transaction::DeployAccountTransaction::V1(
                starknet_api::transaction::DeployAccountTransactionV1 {
                    max_fee: tx.max_fee,
                    signature: tx.signature,
                    nonce: tx.nonce,
                    class_hash: tx.class_hash,
                    contract_address_salt: tx.contract_address_salt,
                    constructor_calldata: tx.constructor_calldata,
                },
            )
        }
        DeployAccountTransaction::Version3(tx) => {
            starknet_api::transaction::DeployAccountTransaction::V3(
                starknet_api::transaction::DeployAccountTransactionV3 {
                    resource_bounds: tx.resource_bounds.into(),
                    tip: tx.tip,
                    signature: tx.signature,
                    nonce: tx.nonce,
                    class_hash: tx.class_hash,
                    contract_address_salt: tx.contract_address_salt,
                    constructor_calldata: tx.constructor_calldata,
                    nonce_data_availability_mode: tx.nonce_data_availability_mode,
                    fee_data_availability_mode: tx.fee_data_availability_mode,
                    paymaster_data: tx.paymaster_data,
                },
            )
        }
    }
}

fn executable_declare(
    tx: BroadcastedDeclareTransaction,
) -> Result<(starknet_api::transaction::DeclareTransaction, Class), ErrorObjectOwned> {
    match tx {
        BroadcastedDeclareTransaction::V1(tx) => {
            let class = cairo0_class(tx.contract_class)?;
            Ok((
                starknet_api::transaction::DeclareTransaction::V1(
                    starknet_api::transaction::DeclareTransactionV0V1 {
                        max_fee: tx.max_fee,
                        signature: tx.signature,
                        nonce: tx.nonce,
                        // The VM resolves the class through the declared-class
                        // list, not the hash.
                        class_hash: ClassHash::default(),
                        sender_address: tx.sender_address,
                    },
                ),
                class,
            ))
        }
        BroadcastedDeclareTransaction::V2(tx) => {
            let class = sierra_class(tx.contract_class)?;
            Ok((
                starknet_api::transaction::DeclareTransaction::V2(
                    starknet_api::transaction::DeclareTransactionV2 {
                        max_fee: tx.max_fee,
                        signature: tx.signature,
                        nonce: tx.nonce,
                        class_hash: ClassHash::default(),
                        compiled_class_hash: tx.compiled_class_hash,
                        sender_address: tx.sender_address,
                    },
                ),
                class,
            ))
        }
        BroadcastedDeclareTransaction::V3(tx) => {
            let class = sierra_class(tx.contract_class)?;
            Ok((
                starknet_api::transaction::DeclareTransaction::V3(
                    starknet_api::transaction::DeclareTransactionV3 {
                        resource_bounds: tx.resource_bounds.into(),
                        tip: tx.tip,
                        signature: tx.signature,
                        nonce: tx.nonce,
                        class_hash: ClassHash::default(),
                        compiled_class_hash: tx.compiled_class_hash,
                        sender_address: tx.sender_address,
                        nonce_data_availability_mode: tx.nonce_data_availability_mode,
                        fee_data_availability_mode: tx.fee_data_availability_mode,
                        paymaster_data: tx.paymaster_data,
                        account_deployment_data: tx.account_deployment_data,
                    },
                ),
                class,
            ))
        }
    }
}

fn cairo0_class(value: serde_json::Value) -> Result<Class, ErrorObjectOwned> {
    let class: crate::deprecated_contract_class::ContractClass = serde_json::from_value(value)
        .map_err(|err| {
            ErrorObjectOwned::from(unexpected_error(format!("invalid contract class: {err}")))
        })?;
    Ok(Class::Cairo0(class.into()))
}

fn sierra_class(value: serde_json::Value) -> Result<Class, ErrorObjectOwned> {
    let class: crate::state::ContractClass =
        serde_json::from_value(value).map_err(|err| {
            ErrorObjectOwned::from(unexpected_error(format!("invalid contract class: {err}")))
        })?;
    Ok(Class::Sierra(class.into()))
}

/// Every L1 handler in a traced block is assumed to have had its fee paid on
/// L1; the VM only checks that the fee is present, so a sentinel of one wei
/// suffices.
pub fn paid_fees_on_l1(transactions: &[starknet_api::transaction::Transaction]) -> Vec<Fee> {
    transactions
        .iter()
        .filter(|tx| matches!(tx, starknet_api::transaction::Transaction::L1Handler(_)))
        .map(|_| Fee(1))
        .collect()
}
