// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, path::Path, time::Duration};

use pinmint_ledger::{
    provider::DEFAULT_REQUEST_TIMEOUT, Endpoint, EndpointSelector, HttpConnector, LedgerReader,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::asset_store::media_url;

/// Where Pinata accepts uploads unless configured otherwise.
pub const DEFAULT_PINATA_UPLOAD_URL: &str = "https://uploads.pinata.cloud";

/// Environment variables read by the command line for each configuration field.
pub const CONTRACT_ID_VAR: &str = "PINMINT_CONTRACT_ID";
pub const PINATA_GATEWAY_VAR: &str = "PINMINT_PINATA_GATEWAY";
pub const PINATA_JWT_VAR: &str = "PINMINT_PINATA_JWT";
pub const RPC_ENDPOINTS_VAR: &str = "PINMINT_RPC_ENDPOINTS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing required configuration value `{0}`")]
    MissingField(&'static str),
    #[error("at least one RPC endpoint must be configured")]
    EmptyEndpointList,
    #[error("invalid RPC endpoint {endpoint:?}: {error}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        error: url::ParseError,
    },
    #[error("invalid Pinata upload URL {url:?}: {error}")]
    InvalidUploadUrl {
        url: String,
        #[source]
        error: url::ParseError,
    },
}

/// Configuration as read from a file, the environment or the command line. Every field
/// is optional here; [`RawMintConfig::validate`] decides what is missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMintConfig {
    pub contract_id: Option<String>,
    pub pinata_gateway: Option<String>,
    pub pinata_jwt: Option<String>,
    pub rpc_endpoints: Option<Vec<String>>,
    pub request_timeout_ms: Option<u64>,
    pub pinata_upload_url: Option<String>,
}

impl RawMintConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs_err::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Fills the fields left empty in `self` from `fallback`.
    pub fn or(self, fallback: RawMintConfig) -> Self {
        Self {
            contract_id: self.contract_id.or(fallback.contract_id),
            pinata_gateway: self.pinata_gateway.or(fallback.pinata_gateway),
            pinata_jwt: self.pinata_jwt.or(fallback.pinata_jwt),
            rpc_endpoints: self.rpc_endpoints.or(fallback.rpc_endpoints),
            request_timeout_ms: self.request_timeout_ms.or(fallback.request_timeout_ms),
            pinata_upload_url: self.pinata_upload_url.or(fallback.pinata_upload_url),
        }
    }

    pub fn validate(self) -> Result<MintConfig, ConfigError> {
        let contract_id = required(self.contract_id, "contract_id")?;
        let pinata_gateway = required(self.pinata_gateway, "pinata_gateway")?;
        let pinata_gateway = strip_scheme(&pinata_gateway)
            .trim_end_matches('/')
            .to_string();
        let pinata_jwt = required(self.pinata_jwt, "pinata_jwt")?;
        let rpc_endpoints = self
            .rpc_endpoints
            .ok_or(ConfigError::MissingField("rpc_endpoints"))?
            .into_iter()
            .filter(|endpoint| !endpoint.trim().is_empty())
            .map(|endpoint| {
                endpoint
                    .parse::<Endpoint>()
                    .map_err(|error| ConfigError::InvalidEndpoint { endpoint, error })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if rpc_endpoints.is_empty() {
            return Err(ConfigError::EmptyEndpointList);
        }
        let upload_url = self
            .pinata_upload_url
            .unwrap_or_else(|| DEFAULT_PINATA_UPLOAD_URL.to_string());
        let mut pinata_upload_url =
            Url::parse(&upload_url).map_err(|error| ConfigError::InvalidUploadUrl {
                url: upload_url.clone(),
                error,
            })?;
        // Routes are joined onto this base, which drops a last segment without a slash.
        if !pinata_upload_url.path().ends_with('/') {
            let path = format!("{}/", pinata_upload_url.path());
            pinata_upload_url.set_path(&path);
        }
        let request_timeout = self
            .request_timeout_ms
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis);
        Ok(MintConfig {
            contract_id,
            pinata_gateway,
            pinata_jwt,
            rpc_endpoints,
            request_timeout,
            pinata_upload_url,
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingField(name))
}

fn strip_scheme(host: &str) -> &str {
    host.strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host)
}

/// Splits a comma-separated list of endpoints.
pub fn parse_endpoint_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty())
        .map(String::from)
        .collect()
}

/// The validated configuration of a minting client.
#[derive(Clone)]
pub struct MintConfig {
    /// The account the NFT contract is deployed to.
    pub contract_id: String,
    /// The host name of the IPFS gateway media addresses point to.
    pub pinata_gateway: String,
    pub pinata_jwt: String,
    /// RPC endpoints, in order of preference.
    pub rpc_endpoints: Vec<Endpoint>,
    pub request_timeout: Duration,
    pub pinata_upload_url: Url,
}

impl fmt::Debug for MintConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MintConfig")
            .field("contract_id", &self.contract_id)
            .field("pinata_gateway", &self.pinata_gateway)
            .field("pinata_jwt", &"<redacted>")
            .field("rpc_endpoints", &self.rpc_endpoints)
            .field("request_timeout", &self.request_timeout)
            .field("pinata_upload_url", &self.pinata_upload_url)
            .finish()
    }
}

impl MintConfig {
    /// The public address of pinned content.
    pub fn media_url(&self, cid: &str) -> String {
        media_url(&self.pinata_gateway, cid)
    }

    pub fn endpoint_selector(&self) -> EndpointSelector<HttpConnector> {
        EndpointSelector::with_http(self.rpc_endpoints.clone(), self.request_timeout)
    }

    pub fn ledger_reader(&self) -> LedgerReader<HttpConnector> {
        LedgerReader::new(self.endpoint_selector())
    }
}
