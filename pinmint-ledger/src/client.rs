// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::common::{
    CallResult, Finality, LedgerQuery, LedgerQueryError, LedgerServiceError, NodeStatus,
};

/// A JSON-RPC 2.0 request.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a, T> {
    id: u64,
    jsonrpc: &'a str,
    method: &'a str,
    params: T,
}

impl<'a, T> JsonRpcRequest<'a, T> {
    pub fn new(id: u64, method: &'a str, params: T) -> Self {
        JsonRpcRequest {
            id,
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// The error object of a JSON-RPC response. NEAR nodes add `name`, `cause` and `data` to
/// the standard fields; the useful text can be in any of them.
#[derive(Debug, Deserialize)]
pub struct JsonRpcErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cause: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    /// Flattens every textual part of the error into one message.
    pub fn full_message(&self) -> String {
        let mut parts = vec![self.message.clone()];
        if let Some(name) = &self.name {
            parts.push(name.clone());
        }
        for extra in [&self.data, &self.cause].into_iter().flatten() {
            match extra {
                Value::String(text) => parts.push(text.clone()),
                value => parts.push(value.to_string()),
            }
        }
        parts.retain(|part| !part.is_empty());
        parts.join(": ")
    }
}

/// A JSON-RPC 2.0 response. The result is kept untyped until the envelope is checked.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    id: Value,
    jsonrpc: String,
    result: Option<Value>,
    error: Option<JsonRpcErrorObject>,
}

/// A client speaking JSON-RPC 2.0 to a node. Implementors only provide the transport.
#[async_trait]
pub trait JsonRpcClient {
    /// Returns a fresh request id.
    async fn get_id(&self) -> u64;

    /// Sends a serialized request and returns the raw response body.
    async fn request_inner(&self, payload: Vec<u8>) -> Result<Vec<u8>, LedgerServiceError>;

    async fn request<T, S>(&self, method: &str, params: T) -> Result<S, LedgerServiceError>
    where
        T: Serialize + Send + Sync,
        S: DeserializeOwned + Send,
    {
        let id = self.get_id().await;
        let payload = JsonRpcRequest::new(id, method, params);
        let payload = serde_json::to_vec(&payload)?;
        let body = self.request_inner(payload).await?;
        let response = serde_json::from_slice::<JsonRpcResponse>(&body)?;
        if response.jsonrpc != "2.0" {
            return Err(LedgerQueryError::WrongJsonRpcVersion.into());
        }
        if response.id != Value::from(id) {
            return Err(LedgerQueryError::IdIsNotMatching.into());
        }
        if let Some(error) = response.error {
            return Err(LedgerServiceError::from_remote_message(error.full_message()));
        }
        let result = response.result.ok_or(LedgerQueryError::MissingResult)?;
        Ok(serde_json::from_value(result)?)
    }
}

#[derive(Debug, Serialize)]
struct CallFunctionParams<'a> {
    request_type: &'static str,
    finality: Finality,
    account_id: &'a str,
    method_name: &'a str,
    args_base64: String,
}

/// Encodes view-call arguments the way nodes expect them: base64 of the JSON text.
pub fn encode_args(args: &Value) -> Result<String, LedgerServiceError> {
    Ok(BASE64.encode(serde_json::to_vec(args)?))
}

/// The read-only operations used against a ledger node.
#[async_trait]
pub trait LedgerQueries {
    /// Asks the node for its status. Used as a liveness probe.
    async fn status(&self) -> Result<NodeStatus, LedgerServiceError>;

    /// Runs a view method of a contract.
    async fn call_function(&self, query: &LedgerQuery) -> Result<CallResult, LedgerServiceError>;
}

#[async_trait]
impl<C> LedgerQueries for C
where
    C: JsonRpcClient + Sync,
{
    async fn status(&self) -> Result<NodeStatus, LedgerServiceError> {
        self.request("status", Value::Array(Vec::new())).await
    }

    async fn call_function(&self, query: &LedgerQuery) -> Result<CallResult, LedgerServiceError> {
        let params = CallFunctionParams {
            request_type: "call_function",
            finality: query.finality,
            account_id: &query.contract_id,
            method_name: &query.method_name,
            args_base64: encode_args(&query.args)?,
        };
        let mut value: Value = self.request("query", params).await?;
        // Older nodes report contract failures inside the result object.
        if let Some(error) = value.get_mut("error") {
            let message = match error.take() {
                Value::String(message) => message,
                other => other.to_string(),
            };
            return Err(LedgerServiceError::from_remote_message(message));
        }
        Ok(serde_json::from_value(value)?)
    }
}
