// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory wallet, asset store and modal for tests.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use pinmint_ledger::{test_utils::MockLedger, Endpoint, Token, TokenMetadata};
use serde_json::{json, Value};

use crate::{
    asset_store::{AssetFile, AssetStore, AssetStoreError, UploadOptions, UploadedAsset},
    config::{MintConfig, RawMintConfig},
    mint::{INIT_METHOD, MINT_METHOD},
    wallet::{LedgerWallet, ModalController, Transaction, WalletAccount, WalletError},
};

pub const TEST_CONTRACT_ID: &str = "nftmint.testnet";
pub const TEST_GATEWAY: &str = "g.example";

/// The collaborator calls made during a test, in order.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    pub fn push(&self, call: &'static str) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

pub fn test_config(rpc_endpoints: Vec<Endpoint>) -> MintConfig {
    RawMintConfig {
        contract_id: Some(TEST_CONTRACT_ID.to_string()),
        pinata_gateway: Some(TEST_GATEWAY.to_string()),
        pinata_jwt: Some("test-jwt".to_string()),
        rpc_endpoints: Some(rpc_endpoints.iter().map(ToString::to_string).collect()),
        request_timeout_ms: Some(Duration::from_secs(5).as_millis() as u64),
        pinata_upload_url: None,
    }
    .validate()
    .unwrap()
}

/// A wallet that executes mint and initialization calls directly on a [`MockLedger`].
pub struct FakeWallet {
    accounts: Mutex<Vec<WalletAccount>>,
    ledger: Option<Arc<MockLedger>>,
    rejecting: AtomicBool,
    transactions: Mutex<Vec<Transaction>>,
    log: CallLog,
}

impl FakeWallet {
    pub fn new(account_id: &str, log: CallLog) -> Self {
        Self {
            accounts: Mutex::new(vec![WalletAccount::new(account_id)]),
            ledger: None,
            rejecting: AtomicBool::new(false),
            transactions: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn signed_out(log: CallLog) -> Self {
        let wallet = Self::new("", log);
        wallet.accounts.lock().unwrap().clear();
        wallet
    }

    pub fn with_ledger(mut self, ledger: Arc<MockLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Makes the user decline every following signature request.
    pub fn reject_transactions(&self) {
        self.rejecting.store(true, Ordering::SeqCst);
    }

    pub fn sign_in(&self, account_id: &str) {
        *self.accounts.lock().unwrap() = vec![WalletAccount::new(account_id)];
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.lock().unwrap().clone()
    }

    fn execute(&self, transaction: &Transaction) {
        let Some(ledger) = &self.ledger else {
            return;
        };
        for call in transaction.function_calls() {
            match call.method_name.as_str() {
                MINT_METHOD => {
                    let metadata: TokenMetadata =
                        serde_json::from_value(call.args["token_metadata"].clone()).unwrap();
                    ledger.mint(Token {
                        token_id: call.args["token_id"].as_str().unwrap().to_string(),
                        owner_id: call.args["receiver_id"].as_str().unwrap().to_string(),
                        metadata: Some(metadata),
                    });
                }
                INIT_METHOD => ledger.initialize(),
                method => panic!("unexpected method {method}"),
            }
        }
    }
}

#[async_trait]
impl LedgerWallet for FakeWallet {
    async fn get_accounts(&self) -> Result<Vec<WalletAccount>, WalletError> {
        self.log.push("get_accounts");
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn sign_and_send_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<Value, WalletError> {
        self.log.push("sign_and_send_transaction");
        self.transactions.lock().unwrap().push(transaction.clone());
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected);
        }
        self.execute(&transaction);
        Ok(json!({ "status": { "SuccessValue": "" } }))
    }

    async fn sign_out(&self) -> Result<(), WalletError> {
        self.log.push("sign_out");
        self.accounts.lock().unwrap().clear();
        Ok(())
    }
}

/// An asset store answering every upload with the same content identifier.
pub struct FakeAssetStore {
    cid: String,
    failure: Option<String>,
    uploads: Mutex<Vec<(AssetFile, UploadOptions)>>,
    log: CallLog,
}

impl FakeAssetStore {
    pub fn new(cid: &str, log: CallLog) -> Self {
        Self {
            cid: cid.to_string(),
            failure: None,
            uploads: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn failing(message: &str, log: CallLog) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new("", log)
        }
    }

    pub fn uploads(&self) -> Vec<(AssetFile, UploadOptions)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for FakeAssetStore {
    async fn upload(
        &self,
        file: &AssetFile,
        options: &UploadOptions,
    ) -> Result<UploadedAsset, AssetStoreError> {
        self.log.push("upload");
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((file.clone(), options.clone()));
        if let Some(message) = &self.failure {
            return Err(AssetStoreError::Other(message.clone()));
        }
        Ok(UploadedAsset {
            id: format!("upload-{}", uploads.len()),
            name: options.name.clone(),
            cid: self.cid.clone(),
            size: file.bytes.len() as u64,
        })
    }
}

#[derive(Default)]
pub struct FakeModal {
    shown: AtomicUsize,
}

impl FakeModal {
    pub fn times_shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

impl ModalController for FakeModal {
    fn show(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }
}
