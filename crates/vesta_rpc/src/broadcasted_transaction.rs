//! Transactions as users submit them: like their stored counterparts, except
//! declares carry the full class instead of its hash.

use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use starknet_api::core::{CompiledClassHash, ContractAddress, Nonce};
use starknet_api::data_availability::DataAvailabilityMode;
use starknet_api::transaction::{
    AccountDeploymentData,
    Fee,
    PaymasterData,
    Tip,
    TransactionSignature,
    TransactionVersion,
};

use crate::compression_utils::compress_program;
use crate::internal_server_error;
use crate::transaction::{
    DeployAccountTransaction,
    InvokeTransaction,
    ResourceBoundsMapping,
};

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum BroadcastedTransaction {
    #[serde(rename = "DECLARE")]
    Declare(BroadcastedDeclareTransaction),
    #[serde(rename = "DEPLOY_ACCOUNT")]
    DeployAccount(DeployAccountTransaction),
    #[serde(rename = "DEPLOY")]
    Deploy(starknet_api::transaction::DeployTransaction),
    #[serde(rename = "INVOKE")]
    Invoke(InvokeTransaction),
}

// Variant order matters: the untagged representation picks the first variant
// that fits, and v1 is a field subset of v2.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BroadcastedDeclareTransaction {
    V3(BroadcastedDeclareV3Transaction),
    V2(BroadcastedDeclareV2Transaction),
    V1(BroadcastedDeclareV1Transaction),
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct BroadcastedDeclareV1Transaction {
    pub contract_class: serde_json::Value,
    pub sender_address: ContractAddress,
    pub nonce: Nonce,
    pub max_fee: Fee,
    pub version: TransactionVersion,
    pub signature: TransactionSignature,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct BroadcastedDeclareV2Transaction {
    pub contract_class: serde_json::Value,
    pub compiled_class_hash: CompiledClassHash,
    pub sender_address: ContractAddress,
    pub nonce: Nonce,
    pub max_fee: Fee,
    pub version: TransactionVersion,
    pub signature: TransactionSignature,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct BroadcastedDeclareV3Transaction {
    pub contract_class: serde_json::Value,
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

/// Re-shapes a broadcasted transaction into the JSON dialect the gateway
/// speaks: its own type tags, integer data-availability modes, capitalized
/// resource-bound keys and gzipped class programs.
pub fn gateway_transaction(
    transaction: &BroadcastedTransaction,
) -> Result<serde_json::Value, ErrorObjectOwned> {
    let (gateway_type, mut object) = match transaction {
        BroadcastedTransaction::Declare(declare) => {
            ("DECLARE", serde_json::to_value(declare).map_err(internal_server_error)?)
        }
        BroadcastedTransaction::DeployAccount(deploy_account) => (
            "DEPLOY_ACCOUNT",
            serde_json::to_value(deploy_account).map_err(internal_server_error)?,
        ),
        BroadcastedTransaction::Deploy(deploy) => {
            ("DEPLOY", serde_json::to_value(deploy).map_err(internal_server_error)?)
        }
        BroadcastedTransaction::Invoke(invoke) => {
            ("INVOKE_FUNCTION", serde_json::to_value(invoke).map_err(internal_server_error)?)
        }
    };

    let fields = object
        .as_object_mut()
        .ok_or_else(|| internal_server_error("transaction did not serialize to an object"))?;
    fields.insert("type".to_owned(), json!(gateway_type));

    if let Some(bounds) = fields.remove("resource_bounds") {
        let mut gateway_bounds = serde_json::Map::new();
        if let serde_json::Value::Object(bounds) = bounds {
            for (key, value) in bounds {
                gateway_bounds.insert(key.to_uppercase(), value);
            }
        }
        fields.insert("resource_bounds".to_owned(), serde_json::Value::Object(gateway_bounds));
    }
    for da_field in ["nonce_data_availability_mode", "fee_data_availability_mode"] {
        if let Some(mode) = fields.remove(da_field) {
            let as_number = match mode.as_str() {
                Some("L2") => 1,
                _ => 0,
            };
            fields.insert(da_field.to_owned(), json!(as_number));
        }
    }
    if let Some(mut contract_class) = fields.remove("contract_class") {
        if let Some(class_fields) = contract_class.as_object_mut() {
            for program_field in ["sierra_program", "program"] {
                if let Some(program) = class_fields.remove(program_field) {
                    let compressed =
                        compress_program(&program).map_err(internal_server_error)?;
                    class_fields.insert(program_field.to_owned(), json!(compressed));
                }
            }
        }
        fields.insert("contract_class".to_owned(), contract_class);
    }

    Ok(object)
}
