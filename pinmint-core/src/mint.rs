// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Upload-then-mint as one operation over two systems that share no atomicity.
//!
//! The media file is pinned first and the mint transaction references it. If the wallet
//! then fails or the user declines, the pinned file stays orphaned: nothing is deleted and
//! nothing is retried. A retry is a new call, which uploads again.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use pinmint_ledger::{endpoint::Connector, HttpConnector, LedgerReader, Token, TokenMetadata};
use rand::Rng as _;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    asset_store::{AssetFile, AssetStore, AssetStoreError, UploadOptions},
    config::MintConfig,
    wallet::{Balance, Gas, LedgerWallet, Transaction, WalletError},
};

pub const MINT_METHOD: &str = "nft_mint";
pub const INIT_METHOD: &str = "new_default_meta";

pub const MINT_GAS: Gas = Gas::from_tgas(300);
/// Storage rent attached to every mint: 0.01 NEAR. This is a fixed policy, not computed
/// from the size of the metadata, so large metadata may still be rejected by the contract.
pub const MINT_DEPOSIT: Balance = Balance::from_millinear(10);
pub const INIT_GAS: Gas = Gas::from_tgas(300);

/// The `type` tag of pinned media.
pub const MEDIA_TYPE_TAG: &str = "nft-media";

const TOKEN_ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Returns `nft-<unix millis>-<9 random base-36 characters>`.
pub fn generate_token_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let mut rng = rand::thread_rng();
    let suffix = (0..TOKEN_ID_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect::<String>();
    format!("nft-{millis}-{suffix}")
}

/// The `nft_mint` call of `token_id` to `receiver_id`.
pub fn mint_transaction(
    contract_id: &str,
    signer_id: &str,
    receiver_id: &str,
    token_id: &str,
    metadata: &TokenMetadata,
) -> Result<Transaction, serde_json::Error> {
    let args = json!({
        "token_id": token_id,
        "receiver_id": receiver_id,
        "token_metadata": serde_json::to_value(metadata)?,
    });
    Ok(Transaction::function_call(
        signer_id,
        contract_id,
        MINT_METHOD,
        args,
        MINT_GAS,
        MINT_DEPOSIT,
    ))
}

/// The `new_default_meta` call making `owner_id` the owner of the contract.
pub fn init_transaction(contract_id: &str, owner_id: &str) -> Transaction {
    Transaction::function_call(
        owner_id,
        contract_id,
        INIT_METHOD,
        json!({ "owner_id": owner_id }),
        INIT_GAS,
        Balance::ZERO,
    )
}

/// What the user asked to mint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MintRequest {
    pub title: String,
    pub description: Option<String>,
    pub file: Option<AssetFile>,
    /// Set once the file is pinned.
    pub media_url: Option<String>,
    /// The account receiving the token: the connected session.
    pub receiver_id: Option<String>,
}

impl MintRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_file(mut self, file: AssetFile) -> Self {
        self.file = Some(file);
        self
    }

    pub fn for_receiver(mut self, receiver_id: impl Into<String>) -> Self {
        self.receiver_id = Some(receiver_id.into());
        self
    }
}

/// The progress of one mint attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MintState {
    Idle,
    Validating,
    Uploading,
    Assembling,
    AwaitingSignature,
    Confirming,
    Succeeded,
    Failed,
}

impl MintState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("invalid mint request: {0}")]
    InvalidRequest(String),
    #[error("failed to upload the media file: {0}")]
    UploadFailed(#[source] AssetStoreError),
    #[error("mint transaction failed, {media_url} stays pinned: {error}")]
    WriteFailed {
        media_url: String,
        #[source]
        error: WalletError,
    },
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// A successful mint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Minted {
    /// The token as read back from the contract, or as sent when it could not be read yet.
    pub token: Token,
    /// The owner's tokens after the mint, or `None` if the refresh failed.
    pub tokens: Option<Vec<Token>>,
}

/// Sequences validation, upload, transaction assembly, signing and refresh.
pub struct MintCoordinator<K = HttpConnector> {
    config: MintConfig,
    reader: Arc<LedgerReader<K>>,
    state: watch::Sender<MintState>,
}

impl<K> MintCoordinator<K>
where
    K: Connector,
{
    pub fn new(config: MintConfig, reader: Arc<LedgerReader<K>>) -> Self {
        let (state, _) = watch::channel(MintState::Idle);
        Self {
            config,
            reader,
            state,
        }
    }

    pub fn config(&self) -> &MintConfig {
        &self.config
    }

    pub fn reader(&self) -> &Arc<LedgerReader<K>> {
        &self.reader
    }

    pub fn state(&self) -> MintState {
        *self.state.borrow()
    }

    /// Follows the state of the current and future attempts.
    pub fn subscribe(&self) -> watch::Receiver<MintState> {
        self.state.subscribe()
    }

    fn enter(&self, state: MintState) {
        debug!(?state, "Mint state");
        self.state.send_replace(state);
    }

    #[instrument(skip_all, fields(title = %request.title))]
    pub async fn mint<W, S>(
        &self,
        request: MintRequest,
        wallet: &W,
        store: &S,
    ) -> Result<Minted, MintError>
    where
        W: LedgerWallet + ?Sized,
        S: AssetStore + ?Sized,
    {
        self.enter(MintState::Idle);
        let result = self.run(request, wallet, store).await;
        match &result {
            Ok(minted) => {
                info!(token_id = %minted.token.token_id, "NFT minted");
                self.enter(MintState::Succeeded);
            }
            Err(error) => {
                warn!(%error, "Mint failed");
                self.enter(MintState::Failed);
            }
        }
        result
    }

    async fn run<W, S>(
        &self,
        mut request: MintRequest,
        wallet: &W,
        store: &S,
    ) -> Result<Minted, MintError>
    where
        W: LedgerWallet + ?Sized,
        S: AssetStore + ?Sized,
    {
        self.enter(MintState::Validating);
        if request.title.trim().is_empty() {
            return Err(MintError::InvalidRequest("a title is required".into()));
        }
        let Some(file) = request.file.take() else {
            return Err(MintError::InvalidRequest("no file selected".into()));
        };
        let Some(receiver_id) = request.receiver_id.clone().filter(|id| !id.is_empty()) else {
            return Err(MintError::InvalidRequest("no wallet connected".into()));
        };
        let signer_id = wallet
            .signer_id()
            .await
            .map_err(|error| MintError::InvalidRequest(format!("no signer available: {error}")))?;
        if signer_id != receiver_id {
            return Err(MintError::InvalidRequest(format!(
                "connected account {receiver_id} is not the wallet account {signer_id}"
            )));
        }

        self.enter(MintState::Uploading);
        let options = UploadOptions::new(&request.title)
            .with_key_value("type", MEDIA_TYPE_TAG)
            .with_key_value("owner", &receiver_id);
        let asset = store
            .upload(&file, &options)
            .await
            .map_err(MintError::UploadFailed)?;
        let media_url = self.config.media_url(&asset.cid);
        info!(%media_url, "Media pinned");
        request.media_url = Some(media_url.clone());

        self.enter(MintState::Assembling);
        let token_id = generate_token_id();
        let metadata = TokenMetadata {
            title: Some(request.title.clone()),
            description: request.description.clone(),
            media: Some(media_url.clone()),
            copies: Some(1),
            ..TokenMetadata::default()
        };
        let transaction = mint_transaction(
            &self.config.contract_id,
            &signer_id,
            &receiver_id,
            &token_id,
            &metadata,
        )?;

        self.enter(MintState::AwaitingSignature);
        wallet
            .sign_and_send_transaction(transaction)
            .await
            .map_err(|error| MintError::WriteFailed { media_url, error })?;

        self.enter(MintState::Confirming);
        let tokens = match self
            .reader
            .tokens_for_owner(&self.config.contract_id, &signer_id)
            .await
        {
            Ok(tokens) => Some(tokens),
            Err(error) => {
                warn!(%error, "Could not refresh tokens after minting");
                None
            }
        };
        let token = tokens
            .iter()
            .flatten()
            .find(|token| token.token_id == token_id)
            .cloned()
            .unwrap_or_else(|| {
                debug!(%token_id, "Minted token not visible yet");
                Token {
                    token_id,
                    owner_id: receiver_id,
                    metadata: Some(metadata),
                }
            });
        Ok(Minted { token, tokens })
    }
}
