// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use assert_matches::assert_matches;
use pinmint_core::{
    asset_store::AssetFile,
    session::{GalleryItem, PLACEHOLDER_MEDIA},
    test_utils::{test_config, CallLog, FakeAssetStore, FakeModal, FakeWallet, TEST_CONTRACT_ID},
    MintCoordinator, MintError, MintRequest, SessionError, SessionManager,
};
use pinmint_ledger::{
    common::InitializationStatus,
    test_utils::{MockLedger, MockRpcNode},
    Token, TokenMetadata,
};

const ALICE: &str = "alice.testnet";
const BOB: &str = "bob.testnet";

type TestSession = SessionManager<FakeWallet, FakeAssetStore, FakeModal>;

struct Harness {
    ledger: Arc<MockLedger>,
    _node: MockRpcNode,
    wallet: Arc<FakeWallet>,
    store: Arc<FakeAssetStore>,
    modal: Arc<FakeModal>,
    session: Arc<TestSession>,
    log: CallLog,
}

impl Harness {
    async fn new(ledger: Arc<MockLedger>, account: Option<&str>) -> Self {
        let node = MockRpcNode::spawn(ledger.clone()).await;
        let config = test_config(vec![node.endpoint.clone()]);
        let coordinator = Arc::new(MintCoordinator::new(
            config.clone(),
            Arc::new(config.ledger_reader()),
        ));
        let log = CallLog::default();
        let wallet = match account {
            Some(account) => FakeWallet::new(account, log.clone()),
            None => FakeWallet::signed_out(log.clone()),
        };
        let wallet = Arc::new(wallet.with_ledger(ledger.clone()));
        let store = Arc::new(FakeAssetStore::new("bafy123", log.clone()));
        let modal = Arc::new(FakeModal::default());
        let session = Arc::new(SessionManager::new(
            wallet.clone(),
            store.clone(),
            modal.clone(),
            coordinator,
        ));
        Self {
            ledger,
            _node: node,
            wallet,
            store,
            modal,
            session,
            log,
        }
    }
}

fn cat_request() -> MintRequest {
    MintRequest::new("Cat")
        .with_description("A cat")
        .with_file(AssetFile::new("img.png", b"png".to_vec()))
}

fn stored_token(token_id: &str, owner_id: &str, metadata: Option<TokenMetadata>) -> Token {
    Token {
        token_id: token_id.to_string(),
        owner_id: owner_id.to_string(),
        metadata,
    }
}

/// Tests that a minted token reads back with the submitted title, description and media.
#[tokio::test]
async fn test_mint_round_trip() -> anyhow::Result<()> {
    let harness = Harness::new(MockLedger::initialized(TEST_CONTRACT_ID), Some(ALICE)).await;
    assert_eq!(harness.session.connect().await?, Some(ALICE.to_string()));
    assert_eq!(harness.modal.times_shown(), 1);
    assert!(harness.session.tokens().is_empty());

    let minted = harness.session.mint(cat_request()).await?;
    let metadata = minted.token.metadata.clone().unwrap();
    assert!(minted.token.token_id.starts_with("nft-"));
    assert_eq!(minted.token.owner_id, ALICE);
    assert_eq!(metadata.title.as_deref(), Some("Cat"));
    assert_eq!(metadata.description.as_deref(), Some("A cat"));
    assert_eq!(
        metadata.media.as_deref(),
        Some("https://g.example/ipfs/bafy123")
    );
    assert_eq!(harness.session.tokens(), vec![minted.token.clone()]);
    assert_eq!(harness.ledger.tokens(), vec![minted.token]);
    assert_eq!(harness.store.uploads().len(), 1);
    assert!(!harness.session.is_busy());
    Ok(())
}

/// Tests that a second trigger while a mint is running is refused.
#[tokio::test]
async fn test_mint_while_busy_is_refused() -> anyhow::Result<()> {
    let harness = Harness::new(MockLedger::initialized(TEST_CONTRACT_ID), Some(ALICE)).await;
    harness.session.restore().await?;

    let handle = harness.session.spawn_mint(cat_request())?;
    assert!(harness.session.is_busy());
    assert_matches!(
        harness.session.mint(cat_request()).await,
        Err(SessionError::Busy)
    );
    assert_matches!(
        harness.session.initialize_contract().await,
        Err(SessionError::Busy)
    );

    handle.await??;
    assert!(!harness.session.is_busy());
    assert_eq!(harness.store.uploads().len(), 1);
    assert_eq!(harness.wallet.transactions().len(), 1);
    Ok(())
}

/// Tests that the busy flag is released when a mint fails.
#[tokio::test]
async fn test_failed_mint_releases_busy_flag() -> anyhow::Result<()> {
    let harness = Harness::new(MockLedger::initialized(TEST_CONTRACT_ID), Some(ALICE)).await;
    harness.session.restore().await?;
    harness.wallet.reject_transactions();

    assert_matches!(
        harness.session.mint(cat_request()).await,
        Err(SessionError::Mint(MintError::WriteFailed { .. }))
    );
    assert!(!harness.session.is_busy());
    assert!(harness.ledger.tokens().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_mint_without_session_is_invalid() {
    let harness = Harness::new(MockLedger::initialized(TEST_CONTRACT_ID), None).await;
    assert_eq!(harness.session.restore().await.unwrap(), None);
    assert_matches!(
        harness.session.mint(cat_request()).await,
        Err(SessionError::Mint(MintError::InvalidRequest(_)))
    );
    assert!(harness.store.uploads().is_empty());
}

#[tokio::test]
async fn test_disconnect_clears_tokens() -> anyhow::Result<()> {
    let ledger = MockLedger::initialized(TEST_CONTRACT_ID);
    ledger.mint(stored_token("nft-1-aaaaaaaaa", ALICE, None));
    let harness = Harness::new(ledger, Some(ALICE)).await;
    harness.session.restore().await?;
    assert_eq!(harness.session.tokens().len(), 1);

    harness.session.disconnect().await?;
    assert_eq!(harness.session.account(), None);
    assert!(harness.session.tokens().is_empty());
    assert!(harness.session.gallery().is_empty());
    assert_eq!(harness.log.calls().last(), Some(&"sign_out"));
    assert_matches!(
        harness.session.refresh().await,
        Err(SessionError::NotConnected)
    );
    Ok(())
}

#[tokio::test]
async fn test_switching_accounts_replaces_tokens() -> anyhow::Result<()> {
    let ledger = MockLedger::initialized(TEST_CONTRACT_ID);
    ledger.mint(stored_token("nft-1-aaaaaaaaa", ALICE, None));
    ledger.mint(stored_token("nft-2-bbbbbbbbb", BOB, None));
    ledger.mint(stored_token("nft-3-ccccccccc", BOB, None));
    let harness = Harness::new(ledger, Some(ALICE)).await;
    harness.session.restore().await?;
    assert_eq!(harness.session.tokens().len(), 1);

    harness.wallet.sign_in(BOB);
    assert_eq!(harness.session.restore().await?, Some(BOB.to_string()));
    let tokens = harness.session.tokens();
    assert_eq!(tokens.len(), 2);
    assert!(tokens.iter().all(|token| token.owner_id == BOB));
    Ok(())
}

#[tokio::test]
async fn test_uninitialized_contract_can_be_initialized() -> anyhow::Result<()> {
    let harness = Harness::new(MockLedger::new(TEST_CONTRACT_ID), Some(ALICE)).await;
    harness.session.connect().await?;
    assert_eq!(
        harness.session.initialization(),
        Some(InitializationStatus::NotInitialized)
    );
    assert!(harness.session.tokens().is_empty());

    let status = harness.session.initialize_contract().await?;
    assert_eq!(
        status,
        InitializationStatus::Initialized(MockLedger::default_metadata())
    );
    assert!(harness.ledger.is_initialized());
    let transactions = harness.wallet.transactions();
    let call = transactions[0].function_calls().next().unwrap();
    assert_eq!(call.method_name, "new_default_meta");
    assert_eq!(call.args["owner_id"], ALICE);
    assert!(!harness.session.is_busy());
    Ok(())
}

#[tokio::test]
async fn test_initialize_without_session() {
    let harness = Harness::new(MockLedger::new(TEST_CONTRACT_ID), None).await;
    assert_matches!(
        harness.session.initialize_contract().await,
        Err(SessionError::NotConnected)
    );
    assert!(harness.wallet.transactions().is_empty());
}

#[tokio::test]
async fn test_failed_refresh_leaves_empty_list() -> anyhow::Result<()> {
    let ledger = MockLedger::initialized(TEST_CONTRACT_ID);
    ledger.mint(stored_token("nft-1-aaaaaaaaa", ALICE, None));
    let harness = Harness::new(ledger.clone(), Some(ALICE)).await;
    harness.session.restore().await?;
    assert_eq!(harness.session.tokens().len(), 1);

    ledger.fail_with("storage is unavailable");
    assert_matches!(
        harness.session.refresh().await,
        Err(SessionError::Ledger(_))
    );
    assert!(harness.session.tokens().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_gallery_fills_in_missing_fields() -> anyhow::Result<()> {
    let ledger = MockLedger::initialized(TEST_CONTRACT_ID);
    ledger.mint(stored_token("nft-1-aaaaaaaaa", ALICE, None));
    ledger.mint(stored_token(
        "nft-2-bbbbbbbbb",
        ALICE,
        Some(TokenMetadata {
            title: Some("Cat".to_string()),
            description: Some("A cat".to_string()),
            media: Some("https://undefined/ipfs/bafy123".to_string()),
            ..TokenMetadata::default()
        }),
    ));
    let harness = Harness::new(ledger, Some(ALICE)).await;
    harness.session.restore().await?;

    assert_eq!(
        harness.session.gallery(),
        vec![
            GalleryItem {
                token_id: "nft-1-aaaaaaaaa".to_string(),
                title: "Untitled".to_string(),
                description: "No description".to_string(),
                image_url: PLACEHOLDER_MEDIA.to_string(),
            },
            GalleryItem {
                token_id: "nft-2-bbbbbbbbb".to_string(),
                title: "Cat".to_string(),
                description: "A cat".to_string(),
                image_url: "https://g.example/ipfs/bafy123".to_string(),
            },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_owner_without_tokens_has_empty_gallery() -> anyhow::Result<()> {
    let ledger = MockLedger::initialized(TEST_CONTRACT_ID);
    ledger.mint(stored_token("nft-1-aaaaaaaaa", BOB, None));
    let harness = Harness::new(ledger, Some(ALICE)).await;
    harness.session.restore().await?;

    assert!(harness.session.refresh().await?.is_empty());
    assert!(harness.session.tokens().is_empty());
    assert!(harness.session.gallery().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_mint_with_failed_refresh_clears_stale_tokens() -> anyhow::Result<()> {
    let ledger = MockLedger::initialized(TEST_CONTRACT_ID);
    ledger.mint(stored_token("nft-1-aaaaaaaaa", ALICE, None));
    let harness = Harness::new(ledger.clone(), Some(ALICE)).await;
    harness.session.restore().await?;
    assert_eq!(harness.session.tokens().len(), 1);

    ledger.fail_with("storage is unavailable");
    let minted = harness.session.mint(cat_request()).await?;
    assert_eq!(minted.tokens, None);
    assert!(harness.session.tokens().is_empty());
    assert_eq!(ledger.tokens().len(), 2);
    assert!(!harness.session.is_busy());
    Ok(())
}

#[tokio::test]
async fn test_title_is_stored_as_given() -> anyhow::Result<()> {
    let harness = Harness::new(MockLedger::initialized(TEST_CONTRACT_ID), Some(ALICE)).await;
    harness.session.restore().await?;

    let request = MintRequest::new(" Cat ").with_file(AssetFile::new("img.png", b"png".to_vec()));
    let minted = harness.session.mint(request).await?;
    let metadata = minted.token.metadata.unwrap();
    assert_eq!(metadata.title.as_deref(), Some(" Cat "));
    assert_eq!(harness.store.uploads()[0].1.name, " Cat ");
    Ok(())
}
