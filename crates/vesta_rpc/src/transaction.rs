#[cfg(test)]
#[path = "transaction_test.rs"]
mod transaction_test;

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use starknet_api::block::{BlockHash, BlockNumber};
use starknet_api::core::{
    ClassHash,
    CompiledClassHash,
    ContractAddress,
    EntryPointSelector,
    EthAddress,
    Nonce,
};
use starknet_api::data_availability::DataAvailabilityMode;
use starknet_api::transaction::{
    AccountDeploymentData,
    Calldata,
    ContractAddressSalt,
    DeployTransaction,
    Fee,
    L1HandlerTransaction,
    L2ToL1Payload,
    PaymasterData,
    Resource,
    ResourceBounds,
    Tip,
    TransactionHash,
    TransactionSignature,
    TransactionVersion,
};

use crate::api::Schema;
use crate::execution::PriceUnit;
use crate::reader::{L1Head, Receipt};

lazy_static! {
    static ref TX_V0: TransactionVersion = TransactionVersion::ZERO;
    static ref TX_V1: TransactionVersion = TransactionVersion::ONE;
    static ref TX_V2: TransactionVersion = TransactionVersion::TWO;
    static ref TX_V3: TransactionVersion = TransactionVersion::THREE;
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Transactions {
    Hashes(Vec<TransactionHash>),
    Full(Vec<TransactionWithHash>),
}

// The serialization of the struct in SN_API is in capital letters, not
// following the spec.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ResourceBoundsMapping {
    pub l1_gas: ResourceBounds,
    pub l2_gas: ResourceBounds,
}

impl From<ResourceBoundsMapping> for starknet_api::transaction::ResourceBoundsMapping {
    fn from(value: ResourceBoundsMapping) -> Self {
        Self([(Resource::L1Gas, value.l1_gas), (Resource::L2Gas, value.l2_gas)].into())
    }
}

impl From<starknet_api::transaction::ResourceBoundsMapping> for ResourceBoundsMapping {
    fn from(value: starknet_api::transaction::ResourceBoundsMapping) -> Self {
        Self {
            l1_gas: value.0.get(&Resource::L1Gas).cloned().unwrap_or_default(),
            l2_gas: value.0.get(&Resource::L2Gas).cloned().unwrap_or_default(),
        }
    }
}

/// The max fee a v3 transaction is presented with on the 0.5 schema, where
/// resource bounds do not exist. Saturates instead of wrapping for bounds
/// beyond 2^128.
fn legacy_max_fee(resource_bounds: &starknet_api::transaction::ResourceBoundsMapping) -> Fee {
    let l1_gas = resource_bounds.0.get(&Resource::L1Gas).cloned().unwrap_or_default();
    Fee(u128::from(l1_gas.max_amount).saturating_mul(l1_gas.max_price_per_unit))
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct DeclareTransactionV0 {
    pub class_hash: ClassHash,
    pub sender_address: ContractAddress,
    pub max_fee: Fee,
    pub version: TransactionVersion,
    pub signature: TransactionSignature,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct DeclareTransactionV1 {
    pub class_hash: ClassHash,
    pub sender_address: ContractAddress,
    pub nonce: Nonce,
    pub max_fee: Fee,
    pub version: TransactionVersion,
    pub signature: TransactionSignature,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct DeclareTransactionV2 {
    pub class_hash: ClassHash,
    pub compiled_class_hash: CompiledClassHash,
    pub sender_address: ContractAddress,
    pub nonce: Nonce,
    pub max_fee: Fee,
    pub version: TransactionVersion,
    pub signature: TransactionSignature,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct DeclareTransactionV3 {
    pub class_hash: ClassHash,
    pub compiled_class_hash: CompiledClassHash,
    pub sender_address: ContractAddress,
    pub nonce: Nonce,
    pub version: TransactionVersion,
    pub signature: TransactionSignature,
    pub resource_bounds: ResourceBoundsMapping,
    pub tip: Tip,
    pub paymaster_data: PaymasterData,
    pub account_deployment_data: AccountDeploymentData,
    pub nonce_data_availability_mode: DataAvailabilityMode,
    pub fee_data_availability_mode: DataAvailabilityMode,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclareTransaction {
    #[serde(deserialize_with = "declare_v0_deserialize")]
    Version0(DeclareTransactionV0),
    Version1(DeclareTransactionV1),
    Version2(DeclareTransactionV2),
    Version3(DeclareTransactionV3),
}

fn declare_v0_deserialize<'de, D>(deserializer: D) -> Result<DeclareTransactionV0, D::Error>
where
    D: Deserializer<'de>,
{
    let v0: DeclareTransactionV0 = Deserialize::deserialize(deserializer)?;
    if v0.version == *TX_V0 {
        Ok(v0)
    } else {
        Err(serde::de::Error::custom("Invalid version value"))
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct DeployAccountTransactionV1 {
    pub max_fee: Fee,
    pub signature: TransactionSignature,
    pub nonce: Nonce,
    pub class_hash: ClassHash,
    pub contract_address_salt: ContractAddressSalt,
    pub constructor_calldata: Calldata,
    pub version: TransactionVersion,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct DeployAccountTransactionV3 {
    pub signature: TransactionSignature,
    pub nonce: Nonce,
    pub class_hash: ClassHash,
    pub contract_address_salt: ContractAddressSalt,
    pub constructor_calldata: Calldata,
    pub version: TransactionVersion,
    pub resource_bounds: ResourceBoundsMapping,
    pub tip: Tip,
    pub paymaster_data: PaymasterData,
    pub nonce_data_availability_mode: DataAvailabilityMode,
    pub fee_data_availability_mode: DataAvailabilityMode,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DeployAccountTransaction {
    Version1(DeployAccountTransactionV1),
    Version3(DeployAccountTransactionV3),
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct InvokeTransactionV0 {
    pub max_fee: Fee,
    pub version: TransactionVersion,
    pub signature: TransactionSignature,
    pub contract_address: ContractAddress,
    pub entry_point_selector: EntryPointSelector,
    pub calldata: Calldata,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct InvokeTransactionV1 {
    pub max_fee: Fee,
    pub version: TransactionVersion,
    pub signature: TransactionSignature,
    pub nonce: Nonce,
    pub sender_address: ContractAddress,
    pub calldata: Calldata,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct InvokeTransactionV3 {
    pub sender_address: ContractAddress,
    pub calldata: Calldata,
    pub version: TransactionVersion,
    pub signature: TransactionSignature,
    pub nonce: Nonce,
    pub resource_bounds: ResourceBoundsMapping,
    pub tip: Tip,
    pub paymaster_data: PaymasterData,
    pub account_deployment_data: AccountDeploymentData,
    pub nonce_data_availability_mode: DataAvailabilityMode,
    pub fee_data_availability_mode: DataAvailabilityMode,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InvokeTransaction {
    Version0(InvokeTransactionV0),
    Version1(InvokeTransactionV1),
    Version3(InvokeTransactionV3),
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct TransactionWithHash {
    pub transaction_hash: TransactionHash,
    #[serde(flatten)]
    pub transaction: Transaction,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Transaction {
    #[serde(rename = "DECLARE")]
    Declare(DeclareTransaction),
    #[serde(rename = "DEPLOY_ACCOUNT")]
    DeployAccount(DeployAccountTransaction),
    #[serde(rename = "DEPLOY")]
    Deploy(DeployTransaction),
    #[serde(rename = "INVOKE")]
    Invoke(InvokeTransaction),
    #[serde(rename = "L1_HANDLER")]
    L1Handler(L1HandlerTransaction),
}

/// Adapts a stored transaction to its wire form. On the legacy schema, v3
/// transactions are re-shaped into the closest pre-0.13 version: the version
/// field is rewritten, `max_fee` is synthesized from the L1 gas bounds and
/// every v3-only field is dropped.
pub fn adapt_transaction(
    tx: starknet_api::transaction::Transaction,
    transaction_hash: TransactionHash,
    schema: Schema,
) -> TransactionWithHash {
    let transaction = match tx {
        starknet_api::transaction::Transaction::Declare(declare_tx) => match declare_tx {
            starknet_api::transaction::DeclareTransaction::V0(tx) => {
                Transaction::Declare(DeclareTransaction::Version0(DeclareTransactionV0 {
                    class_hash: tx.class_hash,
                    sender_address: tx.sender_address,
                    max_fee: tx.max_fee,
                    version: *TX_V0,
                    signature: tx.signature,
                }))
            }
            starknet_api::transaction::DeclareTransaction::V1(tx) => {
                Transaction::Declare(DeclareTransaction::Version1(DeclareTransactionV1 {
                    class_hash: tx.class_hash,
                    sender_address: tx.sender_address,
                    nonce: tx.nonce,
                    max_fee: tx.max_fee,
                    version: *TX_V1,
                    signature: tx.signature,
                }))
            }
            starknet_api::transaction::DeclareTransaction::V2(tx) => {
                Transaction::Declare(DeclareTransaction::Version2(DeclareTransactionV2 {
                    class_hash: tx.class_hash,
                    compiled_class_hash: tx.compiled_class_hash,
                    sender_address: tx.sender_address,
                    nonce: tx.nonce,
                    max_fee: tx.max_fee,
                    version: *TX_V2,
                    signature: tx.signature,
                }))
            }
            starknet_api::transaction::DeclareTransaction::V3(tx) => match schema {
                Schema::Current => {
                    Transaction::Declare(DeclareTransaction::Version3(DeclareTransactionV3 {
                        class_hash: tx.class_hash,
                        compiled_class_hash: tx.compiled_class_hash,
                        sender_address: tx.sender_address,
                        nonce: tx.nonce,
                        version: *TX_V3,
                        signature: tx.signature,
                        resource_bounds: tx.resource_bounds.into(),
                        tip: tx.tip,
                        paymaster_data: tx.paymaster_data,
                        account_deployment_data: tx.account_deployment_data,
                        nonce_data_availability_mode: tx.nonce_data_availability_mode,
                        fee_data_availability_mode: tx.fee_data_availability_mode,
                    }))
                }
                Schema::Legacy => {
                    Transaction::Declare(DeclareTransaction::Version2(DeclareTransactionV2 {
                        class_hash: tx.class_hash,
                        compiled_class_hash: tx.compiled_class_hash,
                        sender_address: tx.sender_address,
                        nonce: tx.nonce,
                        max_fee: legacy_max_fee(&tx.resource_bounds),
                        version: *TX_V2,
                        signature: tx.signature,
                    }))
                }
            },
        },
        starknet_api::transaction::Transaction::Deploy(deploy_tx) => {
            Transaction::Deploy(deploy_tx)
        }
        starknet_api::transaction::Transaction::DeployAccount(deploy_account_tx) => {
            match deploy_account_tx {
                starknet_api::transaction::DeployAccountTransaction::V1(tx) => {
                    Transaction::DeployAccount(DeployAccountTransaction::Version1(
                        DeployAccountTransactionV1 {
                            max_fee: tx.max_fee,
                            signature: tx.signature,
                            nonce: tx.nonce,
                            class_hash: tx.class_hash,
                            contract_address_salt: tx.contract_address_salt,
                            constructor_calldata: tx.constructor_calldata,
                            version: *TX_V1,
                        },
                    ))
                }
                starknet_api::transaction::DeployAccountTransaction::V3(tx) => match schema {
                    Schema::Current => Transaction::DeployAccount(
                        DeployAccountTransaction::Version3(DeployAccountTransactionV3 {
                            signature: tx.signature,
                            nonce: tx.nonce,
                            class_hash: tx.class_hash,
                            contract_address_salt: tx.contract_address_salt,
                            constructor_calldata: tx.constructor_calldata,
                            version: *TX_V3,
                            resource_bounds: tx.resource_bounds.into(),
                            tip: tx.tip,
                            paymaster_data: tx.paymaster_data,
                            nonce_data_availability_mode: tx.nonce_data_availability_mode,
                            fee_data_availability_mode: tx.fee_data_availability_mode,
                        }),
                    ),
                    Schema::Legacy => Transaction::DeployAccount(
                        DeployAccountTransaction::Version1(DeployAccountTransactionV1 {
                            max_fee: legacy_max_fee(&tx.resource_bounds),
                            signature: tx.signature,
                            nonce: tx.nonce,
                            class_hash: tx.class_hash,
                            contract_address_salt: tx.contract_address_salt,
                            constructor_calldata: tx.constructor_calldata,
                            version: *TX_V1,
                        }),
                    ),
                },
            }
        }
        starknet_api::transaction::Transaction::Invoke(invoke_tx) => match invoke_tx {
            starknet_api::transaction::InvokeTransaction::V0(tx) => {
                Transaction::Invoke(InvokeTransaction::Version0(InvokeTransactionV0 {
                    max_fee: tx.max_fee,
                    version: *TX_V0,
                    signature: tx.signature,
                    contract_address: tx.contract_address,
                    entry_point_selector: tx.entry_point_selector,
                    calldata: tx.calldata,
                }))
            }
            starknet_api::transaction::InvokeTransaction::V1(tx) => {
                Transaction::Invoke(InvokeTransaction::Version1(InvokeTransactionV1 {
                    max_fee: tx.max_fee,
                    version: *TX_V1,
                    signature: tx.signature,
                    nonce: tx.nonce,
                    sender_address: tx.sender_address,
                    calldata: tx.calldata,
                }))
            }
            starknet_api::transaction::InvokeTransaction::V3(tx) => match schema {
                Schema::Current => {
                    Transaction::Invoke(InvokeTransaction::Version3(InvokeTransactionV3 {
                        sender_address: tx.sender_address,
                        calldata: tx.calldata,
                        version: *TX_V3,
                        signature: tx.signature,
                        nonce: tx.nonce,
                        resource_bounds: tx.resource_bounds.into(),
                        tip: tx.tip,
                        paymaster_data: tx.paymaster_data,
                        account_deployment_data: tx.account_deployment_data,
                        nonce_data_availability_mode: tx.nonce_data_availability_mode,
                        fee_data_availability_mode: tx.fee_data_availability_mode,
                    }))
                }
                Schema::Legacy => {
                    Transaction::Invoke(InvokeTransaction::Version1(InvokeTransactionV1 {
                        max_fee: legacy_max_fee(&tx.resource_bounds),
                        version: *TX_V1,
                        signature: tx.signature,
                        nonce: tx.nonce,
                        sender_address: tx.sender_address,
                        calldata: tx.calldata,
                    }))
                }
            },
        },
        starknet_api::transaction::Transaction::L1Handler(l1_handler_tx) => {
            Transaction::L1Handler(l1_handler_tx)
        }
    };
    TransactionWithHash { transaction_hash, transaction }
}

pub fn transaction_version(tx: &starknet_api::transaction::Transaction) -> TransactionVersion {
    match tx {
        starknet_api::transaction::Transaction::Declare(tx) => match tx {
            starknet_api::transaction::DeclareTransaction::V0(_) => *TX_V0,
            starknet_api::transaction::DeclareTransaction::V1(_) => *TX_V1,
            starknet_api::transaction::DeclareTransaction::V2(_) => *TX_V2,
            starknet_api::transaction::DeclareTransaction::V3(_) => *TX_V3,
        },
        starknet_api::transaction::Transaction::Deploy(tx) => tx.version,
        starknet_api::transaction::Transaction::DeployAccount(tx) => match tx {
            starknet_api::transaction::DeployAccountTransaction::V1(_) => *TX_V1,
            starknet_api::transaction::DeployAccountTransaction::V3(_) => *TX_V3,
        },
        starknet_api::transaction::Transaction::Invoke(tx) => match tx {
            starknet_api::transaction::InvokeTransaction::V0(_) => *TX_V0,
            starknet_api::transaction::InvokeTransaction::V1(_) => *TX_V1,
            starknet_api::transaction::InvokeTransaction::V3(_) => *TX_V3,
        },
        starknet_api::transaction::Transaction::L1Handler(tx) => tx.version,
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum TransactionType {
    #[serde(rename = "DECLARE")]
    Declare,
    #[serde(rename = "DEPLOY")]
    Deploy,
    #[serde(rename = "DEPLOY_ACCOUNT")]
    DeployAccount,
    #[serde(rename = "INVOKE")]
    Invoke,
    #[serde(rename = "L1_HANDLER")]
    L1Handler,
}

pub fn transaction_type(tx: &starknet_api::transaction::Transaction) -> TransactionType {
    match tx {
        starknet_api::transaction::Transaction::Declare(_) => TransactionType::Declare,
        starknet_api::transaction::Transaction::Deploy(_) => TransactionType::Deploy,
        starknet_api::transaction::Transaction::DeployAccount(_) => TransactionType::DeployAccount,
        starknet_api::transaction::Transaction::Invoke(_) => TransactionType::Invoke,
        starknet_api::transaction::Transaction::L1Handler(_) => TransactionType::L1Handler,
    }
}

/// Transaction finality status on Starknet.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Default)]
pub enum TransactionFinalityStatus {
    #[serde(rename = "ACCEPTED_ON_L2")]
    #[default]
    AcceptedOnL2,
    #[serde(rename = "ACCEPTED_ON_L1")]
    AcceptedOnL1,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Default)]
pub enum TransactionExecutionStatus {
    #[serde(rename = "SUCCEEDED")]
    #[default]
    Succeeded,
    #[serde(rename = "REVERTED")]
    Reverted,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Default)]
pub struct TransactionStatus {
    pub finality_status: TransactionFinalityStatus,
    pub execution_status: TransactionExecutionStatus,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct FeePayment {
    pub amount: Fee,
    pub unit: PriceUnit,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ActualFee {
    /// Current schema: `{amount, unit}`.
    WithUnit(FeePayment),
    /// Legacy schema: a bare fee.
    Amount(Fee),
}

// Note: not the same as the builtin enum in SN_API, the serialization of
// SegmentArena is different.
#[derive(Hash, Debug, Deserialize, Serialize, Clone, Copy, Eq, PartialEq)]
pub enum Builtin {
    #[serde(rename = "range_check_builtin_applications")]
    RangeCheck,
    #[serde(rename = "pedersen_builtin_applications")]
    Pedersen,
    #[serde(rename = "poseidon_builtin_applications")]
    Poseidon,
    #[serde(rename = "ec_op_builtin_applications")]
    EcOp,
    #[serde(rename = "ecdsa_builtin_applications")]
    Ecdsa,
    #[serde(rename = "bitwise_builtin_applications")]
    Bitwise,
    #[serde(rename = "keccak_builtin_applications")]
    Keccak,
    #[serde(rename = "segment_arena_builtin")]
    SegmentArena,
}

impl From<starknet_api::transaction::Builtin> for Builtin {
    fn from(builtin: starknet_api::transaction::Builtin) -> Self {
        match builtin {
            starknet_api::transaction::Builtin::RangeCheck => Builtin::RangeCheck,
            starknet_api::transaction::Builtin::Pedersen => Builtin::Pedersen,
            starknet_api::transaction::Builtin::Poseidon => Builtin::Poseidon,
            starknet_api::transaction::Builtin::EcOp => Builtin::EcOp,
            starknet_api::transaction::Builtin::Ecdsa => Builtin::Ecdsa,
            starknet_api::transaction::Builtin::Bitwise => Builtin::Bitwise,
            starknet_api::transaction::Builtin::Keccak => Builtin::Keccak,
            starknet_api::transaction::Builtin::SegmentArena => Builtin::SegmentArena,
        }
    }
}

/// Current-schema execution resources: bare numbers, only nonzero counters,
/// `steps` always present.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct ExecutionResources {
    pub steps: u64,
    #[serde(flatten)]
    pub builtin_instance_counter: HashMap<Builtin, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_holes: Option<u64>,
}

impl From<starknet_api::transaction::ExecutionResources> for ExecutionResources {
    fn from(value: starknet_api::transaction::ExecutionResources) -> Self {
        Self {
            steps: value.steps,
            builtin_instance_counter: value
                .builtin_instance_counter
                .into_iter()
                .filter_map(|(k, v)| match v {
                    0 => None,
                    _ => Some((k.into(), v)),
                })
                .collect(),
            memory_holes: match value.memory_holes {
                0 => None,
                _ => Some(value.memory_holes),
            },
        }
    }
}

fn u64_as_hex<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:#x}", value))
}

fn u64_from_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let hex: String = Deserialize::deserialize(deserializer)?;
    u64::from_str_radix(hex.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

/// Legacy-schema execution resources: every counter present, as a hex string.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct LegacyExecutionResources {
    #[serde(serialize_with = "u64_as_hex", deserialize_with = "u64_from_hex")]
    pub steps: u64,
    #[serde(serialize_with = "u64_as_hex", deserialize_with = "u64_from_hex")]
    pub memory_holes: u64,
    #[serde(serialize_with = "u64_as_hex", deserialize_with = "u64_from_hex")]
    pub range_check_builtin_applications: u64,
    #[serde(serialize_with = "u64_as_hex", deserialize_with = "u64_from_hex")]
    pub pedersen_builtin_applications: u64,
    #[serde(serialize_with = "u64_as_hex", deserialize_with = "u64_from_hex")]
    pub poseidon_builtin_applications: u64,
    #[serde(serialize_with = "u64_as_hex", deserialize_with = "u64_from_hex")]
    pub ec_op_builtin_applications: u64,
    #[serde(serialize_with = "u64_as_hex", deserialize_with = "u64_from_hex")]
    pub ecdsa_builtin_applications: u64,
    #[serde(serialize_with = "u64_as_hex", deserialize_with = "u64_from_hex")]
    pub bitwise_builtin_applications: u64,
    #[serde(serialize_with = "u64_as_hex", deserialize_with = "u64_from_hex")]
    pub keccak_builtin_applications: u64,
}

impl From<starknet_api::transaction::ExecutionResources> for LegacyExecutionResources {
    fn from(value: starknet_api::transaction::ExecutionResources) -> Self {
        let counter = |builtin: starknet_api::transaction::Builtin| {
            value.builtin_instance_counter.get(&builtin).copied().unwrap_or_default()
        };
        Self {
            steps: value.steps,
            memory_holes: value.memory_holes,
            range_check_builtin_applications: counter(
                starknet_api::transaction::Builtin::RangeCheck,
            ),
            pedersen_builtin_applications: counter(starknet_api::transaction::Builtin::Pedersen),
            poseidon_builtin_applications: counter(starknet_api::transaction::Builtin::Poseidon),
            ec_op_builtin_applications: counter(starknet_api::transaction::Builtin::EcOp),
            ecdsa_builtin_applications: counter(starknet_api::transaction::Builtin::Ecdsa),
            bitwise_builtin_applications: counter(starknet_api::transaction::Builtin::Bitwise),
            keccak_builtin_applications: counter(starknet_api::transaction::Builtin::Keccak),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GeneralExecutionResources {
    Sparse(ExecutionResources),
    Dense(LegacyExecutionResources),
}

/// An L2 → L1 message in a receipt. SN_API's own `MessageToL1` serialization
/// does not render the eth address the way the spec wants it, hence the local
/// mirror.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct MessageToL1 {
    pub from_address: ContractAddress,
    #[serde(serialize_with = "serialize_eth_address")]
    pub to_address: EthAddress,
    pub payload: L2ToL1Payload,
}

// Serialize EthAddress to a 40 character hex string with a 0x prefix.
fn serialize_eth_address<S>(eth_address: &EthAddress, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("0x{}", hex::encode(eth_address.0.as_bytes())))
}

impl From<starknet_api::transaction::MessageToL1> for MessageToL1 {
    fn from(message: starknet_api::transaction::MessageToL1) -> Self {
        Self {
            from_address: message.from_address,
            to_address: message.to_address,
            payload: message.payload,
        }
    }
}

/// An event as carried inside a receipt.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct EventContent {
    pub from_address: ContractAddress,
    pub keys: Vec<starknet_api::transaction::EventKey>,
    pub data: starknet_api::transaction::EventData,
}

impl From<starknet_api::transaction::Event> for EventContent {
    fn from(event: starknet_api::transaction::Event) -> Self {
        Self { from_address: event.from_address, keys: event.content.keys, data: event.content.data }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct TransactionReceipt {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub transaction_hash: TransactionHash,
    pub actual_fee: ActualFee,
    pub finality_status: TransactionFinalityStatus,
    pub execution_status: TransactionExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<BlockHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<BlockNumber>,
    pub messages_sent: Vec<MessageToL1>,
    pub events: Vec<EventContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<ContractAddress>,
    pub execution_resources: GeneralExecutionResources,
}

/// Adapts a stored receipt to its wire form.
///
/// `block` is the block the transaction was sealed into, or `None` while it is
/// still pending; a pending receipt carries no block fields. Finality is
/// decided against the L1 head: everything at or below it is ACCEPTED_ON_L1.
pub fn adapt_receipt(
    tx: &starknet_api::transaction::Transaction,
    receipt: Receipt,
    block: Option<(BlockHash, BlockNumber)>,
    l1_head: Option<&L1Head>,
    schema: Schema,
) -> TransactionReceipt {
    let finality_status = match block {
        Some((_, block_number)) => match l1_head {
            Some(l1_head) if l1_head.block_number >= block_number => {
                TransactionFinalityStatus::AcceptedOnL1
            }
            _ => TransactionFinalityStatus::AcceptedOnL2,
        },
        None => TransactionFinalityStatus::AcceptedOnL2,
    };
    let execution_status = match receipt.revert_reason {
        Some(_) => TransactionExecutionStatus::Reverted,
        None => TransactionExecutionStatus::Succeeded,
    };
    let transaction_type = transaction_type(tx);
    let contract_address = match transaction_type {
        TransactionType::Deploy | TransactionType::DeployAccount => receipt.contract_address,
        _ => None,
    };
    let actual_fee = match schema {
        Schema::Current => {
            let unit = if transaction_version(tx) == *TX_V3 { PriceUnit::Fri } else { PriceUnit::Wei };
            ActualFee::WithUnit(FeePayment { amount: receipt.actual_fee, unit })
        }
        Schema::Legacy => ActualFee::Amount(receipt.actual_fee),
    };
    let execution_resources = match schema {
        Schema::Current => GeneralExecutionResources::Sparse(receipt.execution_resources.into()),
        Schema::Legacy => GeneralExecutionResources::Dense(receipt.execution_resources.into()),
    };
    TransactionReceipt {
        transaction_type,
        transaction_hash: receipt.transaction_hash,
        actual_fee,
        finality_status,
        execution_status,
        block_hash: block.map(|(hash, _)| hash),
        block_number: block.map(|(_, number)| number),
        messages_sent: receipt.messages_sent.into_iter().map(Into::into).collect(),
        events: receipt.events.into_iter().map(Into::into).collect(),
        revert_reason: receipt.revert_reason,
        contract_address,
        execution_resources,
    }
}

/// The status pair reported by `starknet_getTransactionStatus`.
pub fn adapt_status(
    receipt: &Receipt,
    block: Option<(BlockHash, BlockNumber)>,
    l1_head: Option<&L1Head>,
) -> TransactionStatus {
    let finality_status = match block {
        Some((_, block_number)) => match l1_head {
            Some(l1_head) if l1_head.block_number >= block_number => {
                TransactionFinalityStatus::AcceptedOnL1
            }
            _ => TransactionFinalityStatus::AcceptedOnL2,
        },
        None => TransactionFinalityStatus::AcceptedOnL2,
    };
    let execution_status = match receipt.revert_reason {
        Some(_) => TransactionExecutionStatus::Reverted,
        None => TransactionExecutionStatus::Succeeded,
    };
    TransactionStatus { finality_status, execution_status }
}

/// Maps a gateway-reported status onto the wire status pair. `None` when the
/// gateway does not know the transaction either.
pub fn status_from_gateway(
    status: &crate::gateway::GatewayTransactionStatus,
) -> Option<TransactionStatus> {
    let finality_status = match status.status.as_str() {
        "ACCEPTED_ON_L1" => TransactionFinalityStatus::AcceptedOnL1,
        "ACCEPTED_ON_L2" | "PENDING" => TransactionFinalityStatus::AcceptedOnL2,
        _ => return None,
    };
    let execution_status = match status.execution_status.as_deref() {
        Some("REVERTED") => TransactionExecutionStatus::Reverted,
        _ => TransactionExecutionStatus::Succeeded,
    };
    Some(TransactionStatus { finality_status, execution_status })
}
