// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Read-only contract queries on top of endpoint selection.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::{
    client::LedgerQueries,
    common::{
        CallResult, ContractMetadata, InitializationStatus, LedgerQuery, LedgerServiceError,
        Token,
    },
    endpoint::{Connector, EndpointSelector, HttpConnector, SelectedEndpoint},
};

/// Runs view calls against whichever endpoint is live at the time of the call.
/// Nothing is cached.
pub struct LedgerReader<K = HttpConnector> {
    selector: EndpointSelector<K>,
}

impl<K> LedgerReader<K>
where
    K: Connector,
{
    pub fn new(selector: EndpointSelector<K>) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &EndpointSelector<K> {
        &self.selector
    }

    /// Selects an endpoint, then calls `method` of `contract_id` on it.
    #[instrument(level = "debug", skip(self, args))]
    pub async fn query(
        &self,
        contract_id: &str,
        method: &str,
        args: Value,
    ) -> Result<CallResult, LedgerServiceError> {
        let selected = self.selector.select().await?;
        Self::query_selected(&selected, contract_id, method, args).await
    }

    /// Calls `method` of `contract_id` on an already selected endpoint.
    pub async fn query_selected(
        selected: &SelectedEndpoint<K::Client>,
        contract_id: &str,
        method: &str,
        args: Value,
    ) -> Result<CallResult, LedgerServiceError> {
        let query = LedgerQuery::new(contract_id, method, args);
        let result = selected.client.call_function(&query).await?;
        debug!(
            endpoint = %selected.endpoint,
            block_height = result.block_height,
            bytes = result.result.len(),
            "View call succeeded"
        );
        Ok(result)
    }

    /// Like [`Self::query`], decoding the result as JSON.
    pub async fn query_json<T: DeserializeOwned>(
        &self,
        contract_id: &str,
        method: &str,
        args: Value,
    ) -> Result<T, LedgerServiceError> {
        self.query(contract_id, method, args).await?.decode()
    }

    /// Lists the tokens owned by `owner`. An uninitialized contract owns nothing.
    #[instrument(skip(self))]
    pub async fn tokens_for_owner(
        &self,
        contract_id: &str,
        owner: &str,
    ) -> Result<Vec<Token>, LedgerServiceError> {
        let args = json!({ "account_id": owner });
        match self.query_json(contract_id, "nft_tokens_for_owner", args).await {
            Err(error) if error.is_not_initialized() => {
                warn!("Contract is not initialized, no tokens to list");
                Ok(Vec::new())
            }
            result => result,
        }
    }

    pub async fn contract_metadata(
        &self,
        contract_id: &str,
    ) -> Result<ContractMetadata, LedgerServiceError> {
        self.query_json(contract_id, "nft_metadata", json!({})).await
    }

    /// Probes `nft_metadata` to learn whether `new` has been called on the contract.
    #[instrument(skip(self))]
    pub async fn initialization_status(&self, contract_id: &str) -> InitializationStatus {
        match self.contract_metadata(contract_id).await {
            Ok(metadata) => InitializationStatus::Initialized(metadata),
            Err(error) if error.is_not_initialized() => InitializationStatus::NotInitialized,
            Err(error) => {
                warn!(%error, "Could not check contract initialization");
                InitializationStatus::Unknown
            }
        }
    }
}
