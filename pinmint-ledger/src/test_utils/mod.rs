// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! An in-process NFT ledger served over JSON-RPC, for tests.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tokio::{net::TcpListener, task::JoinHandle};

use crate::common::{ContractMetadata, Endpoint, Token, NOT_INITIALIZED_SIGNATURE};

/// The contract state shared by every mock node.
pub struct MockLedger {
    pub contract_id: String,
    contents: Mutex<LedgerContents>,
    block_height: AtomicU64,
}

#[derive(Default)]
struct LedgerContents {
    metadata: Option<ContractMetadata>,
    tokens: Vec<Token>,
    failure: Option<String>,
    legacy_errors: bool,
}

impl MockLedger {
    /// A ledger whose contract was deployed but never initialized.
    pub fn new(contract_id: &str) -> Arc<Self> {
        Arc::new(Self {
            contract_id: contract_id.to_string(),
            contents: Mutex::new(LedgerContents::default()),
            block_height: AtomicU64::new(1),
        })
    }

    /// A ledger whose contract is initialized with default metadata.
    pub fn initialized(contract_id: &str) -> Arc<Self> {
        let ledger = Self::new(contract_id);
        ledger.initialize();
        ledger
    }

    pub fn initialize(&self) {
        self.contents.lock().unwrap().metadata = Some(Self::default_metadata());
    }

    pub fn default_metadata() -> ContractMetadata {
        ContractMetadata {
            spec: "nft-1.0.0".to_string(),
            name: "Example NEAR non-fungible token".to_string(),
            symbol: "EXAMPLE".to_string(),
            icon: None,
            base_uri: None,
            reference: None,
            reference_hash: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.contents.lock().unwrap().metadata.is_some()
    }

    pub fn mint(&self, token: Token) {
        self.contents.lock().unwrap().tokens.push(token);
        self.block_height.fetch_add(1, Ordering::SeqCst);
    }

    pub fn tokens(&self) -> Vec<Token> {
        self.contents.lock().unwrap().tokens.clone()
    }

    /// Makes every view call fail with `message`.
    pub fn fail_with(&self, message: &str) {
        self.contents.lock().unwrap().failure = Some(message.to_string());
    }

    /// Reports contract failures inside the result object instead of as JSON-RPC errors.
    pub fn use_legacy_errors(&self) {
        self.contents.lock().unwrap().legacy_errors = true;
    }

    fn view(&self, params: &Value) -> Result<Vec<u8>, String> {
        let contents = self.contents.lock().unwrap();
        if let Some(failure) = &contents.failure {
            return Err(failure.clone());
        }
        let account_id = params["account_id"].as_str().unwrap_or_default();
        if account_id != self.contract_id {
            return Err(format!(
                "account {account_id} does not exist while viewing"
            ));
        }
        let args = params["args_base64"]
            .as_str()
            .and_then(|args| BASE64.decode(args).ok())
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
            .ok_or_else(|| "invalid args_base64".to_string())?;
        let not_initialized = || {
            format!(
                "wasm execution failed with error: FunctionCallError(ExecutionError(\
                 \"Smart contract panicked: {NOT_INITIALIZED_SIGNATURE}\"))"
            )
        };
        let value = match params["method_name"].as_str().unwrap_or_default() {
            "nft_metadata" => {
                let metadata = contents.metadata.as_ref().ok_or_else(not_initialized)?;
                serde_json::to_value(metadata).unwrap()
            }
            "nft_tokens_for_owner" => {
                if contents.metadata.is_none() {
                    return Err(not_initialized());
                }
                let owner = args["account_id"].as_str().unwrap_or_default();
                let tokens = contents
                    .tokens
                    .iter()
                    .filter(|token| token.owner_id == owner)
                    .collect::<Vec<_>>();
                serde_json::to_value(tokens).unwrap()
            }
            method => {
                return Err(format!(
                    "wasm execution failed with error: \
                     FunctionCallError(MethodResolveError(MethodNotFound)) for {method}"
                ))
            }
        };
        Ok(serde_json::to_vec(&value).unwrap())
    }
}

struct MockNodeState {
    ledger: Arc<MockLedger>,
    live: AtomicBool,
    status_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

/// A JSON-RPC node serving a [`MockLedger`] on a local port.
pub struct MockRpcNode {
    pub endpoint: Endpoint,
    state: Arc<MockNodeState>,
    handle: JoinHandle<()>,
}

impl MockRpcNode {
    /// Starts a live node.
    pub async fn spawn(ledger: Arc<MockLedger>) -> Self {
        Self::spawn_with_liveness(ledger, true).await
    }

    /// Starts a node that answers every request with `503 Service Unavailable`.
    pub async fn spawn_down(ledger: Arc<MockLedger>) -> Self {
        Self::spawn_with_liveness(ledger, false).await
    }

    async fn spawn_with_liveness(ledger: Arc<MockLedger>, live: bool) -> Self {
        let state = Arc::new(MockNodeState {
            ledger,
            live: AtomicBool::new(live),
            status_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/", post(handle_rpc))
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            endpoint: endpoint_for(address),
            state,
            handle,
        }
    }

    pub fn set_live(&self, live: bool) {
        self.state.live.store(live, Ordering::SeqCst);
    }

    /// The number of `status` probes received, live or not.
    pub fn status_calls(&self) -> usize {
        self.state.status_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.state.query_calls.load(Ordering::SeqCst)
    }
}

impl Drop for MockRpcNode {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Returns an endpoint on which nothing listens.
pub async fn unreachable_endpoint() -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    endpoint_for(address)
}

fn endpoint_for(address: SocketAddr) -> Endpoint {
    format!("http://{address}/").parse().unwrap()
}

async fn handle_rpc(
    State(node): State<Arc<MockNodeState>>,
    Json(request): Json<Value>,
) -> Response {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default();
    let counter = match method {
        "status" => &node.status_calls,
        _ => &node.query_calls,
    };
    counter.fetch_add(1, Ordering::SeqCst);
    if !node.live.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "node is down").into_response();
    }
    let ledger = &node.ledger;
    let block_height = ledger.block_height.load(Ordering::SeqCst);
    match method {
        "status" => rpc_result(
            id,
            json!({
                "chain_id": "testnet",
                "sync_info": { "latest_block_height": block_height, "syncing": false },
            }),
        ),
        "query" => match ledger.view(&request["params"]) {
            Ok(bytes) => rpc_result(
                id,
                json!({
                    "result": bytes,
                    "logs": [],
                    "block_height": block_height,
                    "block_hash": "GyGpUuFUGZPBhnMqaWTrJzqGJZDybqAFHi4eUSxC2Zur",
                }),
            ),
            Err(message) if ledger.contents.lock().unwrap().legacy_errors => rpc_result(
                id,
                json!({
                    "error": message,
                    "logs": [],
                    "block_height": block_height,
                    "block_hash": "GyGpUuFUGZPBhnMqaWTrJzqGJZDybqAFHi4eUSxC2Zur",
                }),
            ),
            Err(message) => rpc_error(id, message),
        },
        method => rpc_error(id, format!("Method not found: {method}")),
    }
}

fn rpc_result(id: Value, result: Value) -> Response {
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response()
}

fn rpc_error(id: Value, data: String) -> Response {
    Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "name": "HANDLER_ERROR",
            "cause": { "name": "CONTRACT_EXECUTION_ERROR" },
            "code": -32000,
            "message": "Server error",
            "data": data,
        },
    }))
    .into_response()
}
