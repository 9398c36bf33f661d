// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_lock::Mutex;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};

use crate::{
    client::JsonRpcClient,
    common::{Endpoint, LedgerServiceError},
};

/// The timeout applied to every RPC request unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A JSON-RPC client posting requests to one endpoint over HTTP.
pub struct HttpLedgerClient {
    pub endpoint: Endpoint,
    pub id: Mutex<u64>,
    client: Client,
}

#[async_trait]
impl JsonRpcClient for HttpLedgerClient {
    async fn get_id(&self) -> u64 {
        let mut id = self.id.lock().await;
        *id += 1;
        *id
    }

    async fn request_inner(&self, payload: Vec<u8>) -> Result<Vec<u8>, LedgerServiceError> {
        let response = self
            .client
            .post(self.endpoint.url().clone())
            .body(payload)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|error| format!("Could not get response text: {error}"));
            return Err(LedgerServiceError::HttpStatus {
                url: self.endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        let body = response.bytes().await?;
        Ok(body.as_ref().to_vec())
    }
}

impl HttpLedgerClient {
    /// Creates a client for `endpoint`. No request is sent until the first query.
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self, LedgerServiceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint,
            id: Mutex::new(0),
            client,
        })
    }
}
