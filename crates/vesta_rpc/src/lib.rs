//! The JSON-RPC service layer of the vesta Starknet full node.
//!
//! The handler answers the Starknet API read, write and trace methods against
//! a storage [`reader`], a pending-block buffer and an L1-finality oracle,
//! bridges execution requests to the [`vm`] behind a permit gate, and pushes
//! new-heads notifications to websocket [`subscription`]s. Two wire schemas
//! are served from the same logic: the current one ("0.6.0") and the legacy
//! one ("0.5.1"), which predates v3 transactions.

pub mod api;
pub mod block;
pub mod broadcasted_transaction;
pub mod compression_utils;
pub mod deprecated_contract_class;
pub mod error;
pub mod event;
pub mod execution;
pub mod gateway;
pub mod network;
pub mod reader;
pub mod state;
pub mod subscription;
pub mod sync_reader;
pub mod syncing_state;
pub mod transaction;
pub mod vm;

use std::fmt::Display;
use std::net::SocketAddr;

use jsonrpsee::server::{ServerBuilder, ServerHandle};
use jsonrpsee::types::error::ErrorCode::InternalError;
use jsonrpsee::types::error::INTERNAL_ERROR_MSG;
use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::Methods;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::api::api_impl::JsonRpcServerImpl;
use crate::api::{JsonRpcServer, JsonRpcV0_5Server, JunoRpcServer};
use crate::gateway::SharedGateway;
use crate::network::Network;
use crate::reader::SharedReader;
use crate::sync_reader::SharedSyncReader;
use crate::vm::{SharedVm, ThrottledVm};

/// Maximum size of a supported transaction body - 10MB.
pub const SERVER_MAX_BODY_SIZE: u32 = 10 * 1024 * 1024;

/// The API specification version of the current method set.
pub const CURRENT_SPEC_VERSION: &str = "0.6.0";
/// The API specification version served on the legacy method set.
pub const LEGACY_SPEC_VERSION: &str = "0.5.1";

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RpcConfig {
    pub network: Network,
    pub server_address: String,
    pub max_events_chunk_size: usize,
    pub max_events_keys: usize,
    /// Executions running at once; the rest are refused, not queued.
    pub max_concurrent_vm_calls: usize,
    pub gateway_url: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        RpcConfig {
            network: Network::Mainnet,
            server_address: String::from("0.0.0.0:6060"),
            max_events_chunk_size: 10240,
            max_events_keys: 1024,
            max_concurrent_vm_calls: 4,
            gateway_url: String::from("https://alpha-mainnet.starknet.io"),
        }
    }
}

pub(crate) fn internal_server_error(err: impl Display) -> ErrorObjectOwned {
    error!("{}: {}", INTERNAL_ERROR_MSG, err);
    ErrorObjectOwned::owned(InternalError.code(), INTERNAL_ERROR_MSG, None::<()>)
}

/// Builds the handler and starts the JSON-RPC server with the current, legacy
/// and node method sets. The returned handler keeps serving subscriptions; run
/// [`JsonRpcServerImpl::run`] next to the server handle.
#[instrument(skip(reader, sync_reader, gateway, vm), level = "debug", err)]
pub async fn run_server(
    config: &RpcConfig,
    reader: SharedReader,
    sync_reader: Option<SharedSyncReader>,
    gateway: Option<SharedGateway>,
    vm: SharedVm,
    node_version: &'static str,
) -> anyhow::Result<(SocketAddr, ServerHandle, JsonRpcServerImpl)> {
    debug!("Starting JSON-RPC.");
    let vm = std::sync::Arc::new(ThrottledVm::new(vm, config.max_concurrent_vm_calls));
    let mut handler = JsonRpcServerImpl::new(
        config.network,
        reader,
        vm,
        config.max_events_chunk_size,
        config.max_events_keys,
        node_version,
    );
    if let Some(sync_reader) = sync_reader {
        handler = handler.with_sync_reader(sync_reader);
    }
    if let Some(gateway) = gateway {
        handler = handler.with_gateway(gateway);
    }

    let mut methods: Methods = JsonRpcServer::into_rpc(handler.clone()).into();
    methods.merge(JsonRpcV0_5Server::into_rpc(handler.clone()))?;
    methods.merge(JunoRpcServer::into_rpc(handler.clone()))?;

    let server = ServerBuilder::default()
        .max_request_body_size(SERVER_MAX_BODY_SIZE)
        .build(&config.server_address)
        .await?;
    let addr = server.local_addr()?;
    let handle = server.start(methods);
    info!(local_address = %addr, "JSON-RPC is running.");
    Ok((addr, handle, handler))
}
