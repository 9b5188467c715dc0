//! The write path to the sequencer gateway, plus the transaction-status
//! fallback used when a transaction is not yet in local storage.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use serde::{Deserialize, Serialize};
use starknet_api::transaction::TransactionHash;

use crate::error::{
    JsonRpcError,
    CLASS_ALREADY_DECLARED,
    COMPILATION_FAILED,
    COMPILED_CLASS_HASH_MISMATCH,
    CONTRACT_CLASS_SIZE_IS_TOO_LARGE,
    DUPLICATE_TX,
    FAILED_TO_RECEIVE_TRANSACTION,
    INSUFFICIENT_ACCOUNT_BALANCE,
    INSUFFICIENT_MAX_FEE,
    INVALID_TRANSACTION_NONCE,
    NON_ACCOUNT,
    UNSUPPORTED_CONTRACT_CLASS_VERSION,
    UNSUPPORTED_TX_VERSION,
    validation_failure,
};

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    /// The gateway rejected the request with one of its error codes.
    #[error("gateway error {code}: {message}")]
    Starknet { code: String, message: String },
    #[error("transaction not found")]
    NotFound,
    #[error("{0}")]
    Transport(String),
}

/// A transaction status as reported by the gateway.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GatewayTransactionStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<String>,
}

/// The sequencer gateway client. Transactions are submitted in the gateway's
/// own JSON dialect, produced by the broadcasted-transaction adapter.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn add_transaction(
        &self,
        transaction: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError>;

    async fn transaction_status(
        &self,
        transaction_hash: TransactionHash,
    ) -> Result<GatewayTransactionStatus, GatewayError>;
}

pub type SharedGateway = Arc<dyn Gateway>;

/// Maps a gateway rejection of a submitted transaction onto the write-api
/// error taxonomy.
pub fn starknet_error_to_write_error(code: &str, message: &str) -> JsonRpcError<String> {
    match code {
        "StarknetErrorCode.CLASS_ALREADY_DECLARED" => CLASS_ALREADY_DECLARED,
        "StarknetErrorCode.INVALID_TRANSACTION_NONCE" => INVALID_TRANSACTION_NONCE,
        "StarknetErrorCode.INSUFFICIENT_MAX_FEE" => INSUFFICIENT_MAX_FEE,
        "StarknetErrorCode.INSUFFICIENT_ACCOUNT_BALANCE" => INSUFFICIENT_ACCOUNT_BALANCE,
        "StarknetErrorCode.VALIDATE_FAILURE" => validation_failure(message.to_owned()),
        "StarknetErrorCode.COMPILATION_FAILED" => COMPILATION_FAILED,
        "StarknetErrorCode.CONTRACT_BYTECODE_SIZE_TOO_LARGE"
        | "StarknetErrorCode.CONTRACT_CLASS_OBJECT_SIZE_TOO_LARGE" => {
            CONTRACT_CLASS_SIZE_IS_TOO_LARGE
        }
        "StarknetErrorCode.NON_ACCOUNT" | "StarknetErrorCode.ENTRY_POINT_NOT_FOUND_IN_CONTRACT" => {
            NON_ACCOUNT
        }
        "StarknetErrorCode.DUPLICATED_TRANSACTION" => DUPLICATE_TX,
        "StarknetErrorCode.INVALID_COMPILED_CLASS_HASH" => COMPILED_CLASS_HASH_MISMATCH,
        "StarknetErrorCode.INVALID_TRANSACTION_VERSION" => UNSUPPORTED_TX_VERSION,
        "StarknetErrorCode.INVALID_CONTRACT_CLASS_VERSION" => UNSUPPORTED_CONTRACT_CLASS_VERSION,
        _ => {
            let mut err = FAILED_TO_RECEIVE_TRANSACTION;
            err.data = Some(message.to_owned());
            err
        }
    }
}
