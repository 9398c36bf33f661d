// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Selection of a live RPC endpoint out of an ordered list of candidates.

use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::{
    client::LedgerQueries,
    common::{Endpoint, LedgerServiceError, NodeStatus},
    provider::{HttpLedgerClient, DEFAULT_REQUEST_TIMEOUT},
};

/// Creates the client used to talk to one endpoint.
pub trait Connector {
    type Client: LedgerQueries + Send + Sync;

    fn connect(&self, endpoint: &Endpoint) -> Result<Self::Client, LedgerServiceError>;
}

/// Connects over HTTP with a fixed per-request timeout.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl Connector for HttpConnector {
    type Client = HttpLedgerClient;

    fn connect(&self, endpoint: &Endpoint) -> Result<HttpLedgerClient, LedgerServiceError> {
        HttpLedgerClient::new(endpoint.clone(), self.timeout)
    }
}

/// An endpoint that answered its probe, with the client that reached it.
pub struct SelectedEndpoint<C> {
    pub endpoint: Endpoint,
    pub status: NodeStatus,
    pub client: C,
}

/// Probes candidates in order and keeps the first one that answers.
///
/// Nothing is remembered between calls: every selection starts again from the first
/// candidate, and a failing candidate is not retried.
pub struct EndpointSelector<K = HttpConnector> {
    candidates: Vec<Endpoint>,
    connector: K,
}

impl EndpointSelector<HttpConnector> {
    pub fn with_http(candidates: Vec<Endpoint>, timeout: Duration) -> Self {
        Self::new(candidates, HttpConnector::new(timeout))
    }
}

impl<K> EndpointSelector<K>
where
    K: Connector,
{
    pub fn new(candidates: Vec<Endpoint>, connector: K) -> Self {
        Self {
            candidates,
            connector,
        }
    }

    pub fn candidates(&self) -> &[Endpoint] {
        &self.candidates
    }

    pub fn connector(&self) -> &K {
        &self.connector
    }

    /// Returns the first candidate whose `status` probe succeeds.
    #[instrument(level = "debug", skip(self), fields(candidates = self.candidates.len()))]
    pub async fn select(&self) -> Result<SelectedEndpoint<K::Client>, LedgerServiceError> {
        for endpoint in &self.candidates {
            let client = match self.connector.connect(endpoint) {
                Ok(client) => client,
                Err(error) => {
                    warn!(%endpoint, %error, "Could not create RPC client");
                    continue;
                }
            };
            match client.status().await {
                Ok(status) => {
                    info!(%endpoint, chain_id = %status.chain_id, "Using RPC endpoint");
                    return Ok(SelectedEndpoint {
                        endpoint: endpoint.clone(),
                        status,
                        client,
                    });
                }
                Err(error) => warn!(%endpoint, %error, "RPC endpoint failed"),
            }
        }
        Err(LedgerServiceError::AllEndpointsUnreachable {
            attempted: self.candidates.len(),
        })
    }
}
