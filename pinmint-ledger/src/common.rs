// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// The text a contract panics with when one of its methods is called before `new`.
pub const NOT_INITIALIZED_SIGNATURE: &str = "The contract is not initialized";

#[derive(Error, Debug)]
pub enum LedgerQueryError {
    /// The id should be matching
    #[error("the response id does not match the request id")]
    IdIsNotMatching,

    /// wrong jsonrpc version
    #[error("wrong jsonrpc version")]
    WrongJsonRpcVersion,

    /// Neither a result nor an error in the response
    #[error("the response carries neither a result nor an error")]
    MissingResult,
}

#[derive(Debug, Error)]
pub enum LedgerServiceError {
    /// The JSON-RPC envelope is not coherent
    #[error(transparent)]
    LedgerQueryError(#[from] LedgerQueryError),

    /// Every configured endpoint failed its liveness probe.
    #[error("all {attempted} RPC endpoints failed")]
    AllEndpointsUnreachable { attempted: usize },

    /// The contract exists but `new` was never called on it.
    #[error("contract is not initialized: {0}")]
    ContractNotInitialized(String),

    /// Any other failure reported by the node or the contract.
    #[error("query failed: {0}")]
    QueryError(String),

    #[error("HTTP status {status} from {url}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// `serde_json` error
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// The result bytes are not UTF-8
    #[error(transparent)]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// URL parsing error
    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    /// Reqwest error
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
}

impl LedgerServiceError {
    /// Classifies an error message returned by the node or the contract.
    pub fn from_remote_message(message: String) -> Self {
        if message.contains(NOT_INITIALIZED_SIGNATURE) {
            Self::ContractNotInitialized(message)
        } else {
            Self::QueryError(message)
        }
    }

    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::ContractNotInitialized(_))
    }
}

/// An RPC endpoint. Its priority is its position in the configured list.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint(Url);

impl Endpoint {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Endpoint {
    type Err = url::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Url::parse(s.trim())?))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = url::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.0.into()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How settled the state a view call reads from must be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    #[default]
    Optimistic,
    Final,
}

/// A read-only call of a contract method.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerQuery {
    pub contract_id: String,
    pub method_name: String,
    pub args: serde_json::Value,
    pub finality: Finality,
}

impl LedgerQuery {
    pub fn new(
        contract_id: impl Into<String>,
        method_name: impl Into<String>,
        args: serde_json::Value,
    ) -> Self {
        Self {
            contract_id: contract_id.into(),
            method_name: method_name.into(),
            args,
            finality: Finality::default(),
        }
    }

    pub fn with_finality(mut self, finality: Finality) -> Self {
        self.finality = finality;
        self
    }
}

/// The raw outcome of a successful view call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
    pub result: Vec<u8>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub block_height: u64,
    #[serde(default)]
    pub block_hash: String,
}

impl CallResult {
    /// Decodes the result bytes as UTF-8 JSON.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, LedgerServiceError> {
        let text = String::from_utf8(self.result.clone())?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// The part of the node `status` response needed to tell that a node is alive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub chain_id: String,
    #[serde(default)]
    pub sync_info: SyncInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncInfo {
    #[serde(default)]
    pub latest_block_height: u64,
    #[serde(default)]
    pub syncing: bool,
}

/// Metadata of a single token, following the NEP-177 layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copies: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_hash: Option<String>,
}

/// A minted token as returned by `nft_tokens_for_owner`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_id: String,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TokenMetadata>,
}

impl Token {
    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref()?.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.as_ref()?.description.as_deref()
    }

    pub fn media(&self) -> Option<&str> {
        self.metadata.as_ref()?.media.as_deref()
    }
}

/// Contract-level metadata as returned by `nft_metadata`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetadata {
    pub spec: String,
    pub name: String,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_hash: Option<String>,
}

/// Whether the NFT contract answered its metadata probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitializationStatus {
    Initialized(ContractMetadata),
    NotInitialized,
    /// The probe failed for another reason; nothing is known.
    Unknown,
}

impl InitializationStatus {
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized(_))
    }
}
