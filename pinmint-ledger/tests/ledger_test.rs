// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use assert_matches::assert_matches;
use pinmint_ledger::{
    common::{InitializationStatus, Token, TokenMetadata},
    test_utils::{unreachable_endpoint, MockLedger, MockRpcNode},
    EndpointSelector, LedgerReader, LedgerServiceError,
};
use serde_json::json;

const CONTRACT_ID: &str = "nftmint.testnet";
const TIMEOUT: Duration = Duration::from_secs(5);

fn token(token_id: &str, owner_id: &str, title: &str) -> Token {
    Token {
        token_id: token_id.to_string(),
        owner_id: owner_id.to_string(),
        metadata: Some(TokenMetadata {
            title: Some(title.to_string()),
            media: Some("https://g.example/ipfs/bafy123".to_string()),
            copies: Some(1),
            ..TokenMetadata::default()
        }),
    }
}

#[tokio::test]
async fn test_down_node_is_skipped_and_later_nodes_are_not_probed() -> anyhow::Result<()> {
    let ledger = MockLedger::initialized(CONTRACT_ID);
    let node_a = MockRpcNode::spawn_down(ledger.clone()).await;
    let node_b = MockRpcNode::spawn(ledger.clone()).await;
    let node_c = MockRpcNode::spawn(ledger).await;
    let selector = EndpointSelector::with_http(
        vec![
            node_a.endpoint.clone(),
            node_b.endpoint.clone(),
            node_c.endpoint.clone(),
        ],
        TIMEOUT,
    );

    let selected = selector.select().await?;
    assert_eq!(selected.endpoint, node_b.endpoint);
    assert_eq!(node_a.status_calls(), 1);
    assert_eq!(node_b.status_calls(), 1);
    assert_eq!(node_c.status_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_nodes_are_each_tried_once() -> anyhow::Result<()> {
    let ledger = MockLedger::initialized(CONTRACT_ID);
    let node_a = MockRpcNode::spawn_down(ledger.clone()).await;
    let node_b = MockRpcNode::spawn_down(ledger).await;
    let closed = unreachable_endpoint().await;
    let reader = LedgerReader::new(EndpointSelector::with_http(
        vec![node_a.endpoint.clone(), closed, node_b.endpoint.clone()],
        TIMEOUT,
    ));

    let error = reader
        .tokens_for_owner(CONTRACT_ID, "alice.testnet")
        .await
        .unwrap_err();
    assert_matches!(error, LedgerServiceError::AllEndpointsUnreachable { attempted: 3 });
    assert_eq!(node_a.status_calls(), 1);
    assert_eq!(node_b.status_calls(), 1);
    assert_eq!(node_a.query_calls() + node_b.query_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_tokens_for_owner() -> anyhow::Result<()> {
    let ledger = MockLedger::initialized(CONTRACT_ID);
    ledger.mint(token("nft-1", "alice.testnet", "Cat"));
    ledger.mint(token("nft-2", "bob.testnet", "Dog"));
    ledger.mint(token("nft-3", "alice.testnet", "Owl"));
    let node = MockRpcNode::spawn(ledger).await;
    let reader = LedgerReader::new(EndpointSelector::with_http(
        vec![node.endpoint.clone()],
        TIMEOUT,
    ));

    let tokens = reader.tokens_for_owner(CONTRACT_ID, "alice.testnet").await?;
    let ids = tokens
        .iter()
        .map(|token| token.token_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["nft-1", "nft-3"]);
    assert_eq!(tokens[0].title(), Some("Cat"));

    let tokens = reader.tokens_for_owner(CONTRACT_ID, "carol.testnet").await?;
    assert!(tokens.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_uninitialized_contract_lists_no_tokens() -> anyhow::Result<()> {
    let ledger = MockLedger::new(CONTRACT_ID);
    let node = MockRpcNode::spawn(ledger.clone()).await;
    let reader = LedgerReader::new(EndpointSelector::with_http(
        vec![node.endpoint.clone()],
        TIMEOUT,
    ));

    assert!(reader
        .tokens_for_owner(CONTRACT_ID, "alice.testnet")
        .await?
        .is_empty());
    assert_eq!(
        reader.initialization_status(CONTRACT_ID).await,
        InitializationStatus::NotInitialized
    );

    ledger.use_legacy_errors();
    assert!(reader
        .tokens_for_owner(CONTRACT_ID, "alice.testnet")
        .await?
        .is_empty());

    ledger.initialize();
    assert_eq!(
        reader.initialization_status(CONTRACT_ID).await,
        InitializationStatus::Initialized(MockLedger::default_metadata())
    );
    Ok(())
}

#[tokio::test]
async fn test_query_error_is_propagated() -> anyhow::Result<()> {
    let ledger = MockLedger::initialized(CONTRACT_ID);
    ledger.fail_with("Smart contract panicked: storage is corrupted");
    let node = MockRpcNode::spawn(ledger).await;
    let reader = LedgerReader::new(EndpointSelector::with_http(
        vec![node.endpoint.clone()],
        TIMEOUT,
    ));

    let error = reader
        .tokens_for_owner(CONTRACT_ID, "alice.testnet")
        .await
        .unwrap_err();
    assert_matches!(error, LedgerServiceError::QueryError(message) => {
        assert!(message.contains("storage is corrupted"));
    });
    assert_eq!(
        reader.initialization_status(CONTRACT_ID).await,
        InitializationStatus::Unknown
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_contract() -> anyhow::Result<()> {
    let node = MockRpcNode::spawn(MockLedger::initialized(CONTRACT_ID)).await;
    let reader = LedgerReader::new(EndpointSelector::with_http(
        vec![node.endpoint.clone()],
        TIMEOUT,
    ));

    let error = reader
        .query("someone-else.testnet", "nft_metadata", json!({}))
        .await
        .unwrap_err();
    assert_matches!(error, LedgerServiceError::QueryError(_));
    Ok(())
}

#[tokio::test]
async fn test_every_query_probes_again() -> anyhow::Result<()> {
    let ledger = MockLedger::initialized(CONTRACT_ID);
    let node = MockRpcNode::spawn(ledger).await;
    let reader = LedgerReader::new(EndpointSelector::with_http(
        vec![node.endpoint.clone()],
        TIMEOUT,
    ));

    reader.contract_metadata(CONTRACT_ID).await?;
    reader.contract_metadata(CONTRACT_ID).await?;
    assert_eq!(node.status_calls(), 2);
    assert_eq!(node.query_calls(), 2);
    Ok(())
}
