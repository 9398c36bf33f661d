// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The connected account and what is displayed for it.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

use pinmint_ledger::{
    common::InitializationStatus, endpoint::Connector, HttpConnector, LedgerServiceError, Token,
};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::{
    asset_store::{media_url, AssetStore},
    mint::{init_transaction, MintCoordinator, MintError, MintRequest, Minted},
    wallet::{LedgerWallet, ModalController, WalletError},
};

/// Shown for tokens without media.
pub const PLACEHOLDER_MEDIA: &str = "/placeholder.svg";

/// Media addresses written while the gateway was unset start with this.
const BROKEN_GATEWAY_PREFIX: &str = "https://undefined/ipfs/";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("another operation is in progress")]
    Busy,
    #[error("no wallet is connected")]
    NotConnected,
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Ledger(#[from] LedgerServiceError),
    #[error(transparent)]
    Mint(#[from] MintError),
}

/// Rewrites media addresses that point to an unset gateway onto `gateway`.
pub fn repair_media_url(media: Option<&str>, gateway: &str) -> String {
    match media {
        None | Some("") => PLACEHOLDER_MEDIA.to_string(),
        Some(media) => match media.strip_prefix(BROKEN_GATEWAY_PREFIX) {
            Some(cid) => media_url(gateway, cid),
            None => media.to_string(),
        },
    }
}

/// A token as displayed in the collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GalleryItem {
    pub token_id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
}

/// The connected account and the tokens fetched for it, guarded together.
#[derive(Default)]
struct SessionState {
    account: Option<String>,
    tokens: Vec<Token>,
}

/// Holds the busy flag for as long as it lives.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, SessionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::Busy)?;
        Ok(Self(flag.clone()))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The state behind the minting screen: who is connected, whether the contract is
/// initialized, and which tokens they own.
///
/// At most one mint or initialization runs at a time; a second trigger gets
/// [`SessionError::Busy`]. Token lists are replaced wholesale and never outlive the
/// session they were fetched for.
pub struct SessionManager<W, S, M, K = HttpConnector> {
    wallet: Arc<W>,
    store: Arc<S>,
    modal: Arc<M>,
    coordinator: Arc<MintCoordinator<K>>,
    state: RwLock<SessionState>,
    initialization: RwLock<Option<InitializationStatus>>,
    busy: Arc<AtomicBool>,
}

impl<W, S, M, K> SessionManager<W, S, M, K>
where
    W: LedgerWallet + 'static,
    S: AssetStore + 'static,
    M: ModalController + 'static,
    K: Connector + Send + Sync + 'static,
{
    pub fn new(
        wallet: Arc<W>,
        store: Arc<S>,
        modal: Arc<M>,
        coordinator: Arc<MintCoordinator<K>>,
    ) -> Self {
        Self {
            wallet,
            store,
            modal,
            coordinator,
            state: RwLock::new(SessionState::default()),
            initialization: RwLock::new(None),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn coordinator(&self) -> &Arc<MintCoordinator<K>> {
        &self.coordinator
    }

    pub fn account(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .account
            .clone()
    }

    pub fn tokens(&self) -> Vec<Token> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .tokens
            .clone()
    }

    /// The connected account together with its tokens, read at once.
    pub fn snapshot(&self) -> (Option<String>, Vec<Token>) {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        (state.account.clone(), state.tokens.clone())
    }

    /// `None` until the contract was checked.
    pub fn initialization(&self) -> Option<InitializationStatus> {
        self.initialization
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Switches the session. The token list of the previous account is dropped.
    pub(crate) fn set_account(&self, account: Option<String>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.account != account {
            state.account = account;
            state.tokens.clear();
        }
    }

    /// Stores `tokens` only if `account` is still the connected one.
    pub(crate) fn set_tokens_for(&self, account: &str, tokens: Vec<Token>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.account.as_deref() == Some(account) {
            state.tokens = tokens;
        } else {
            info!(%account, "Discarding tokens of a previous session");
        }
    }

    /// Opens the wallet modal, then picks up the signed-in account.
    pub async fn connect(&self) -> Result<Option<String>, SessionError> {
        info!("Opening wallet modal");
        self.modal.show();
        self.restore().await
    }

    /// Picks up an account the wallet is already signed in with, probes the contract and
    /// loads the account's tokens if it is initialized.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<Option<String>, SessionError> {
        let accounts = self.wallet.get_accounts().await?;
        let Some(account) = accounts.into_iter().next().map(|a| a.account_id) else {
            info!("No accounts found");
            self.set_account(None);
            self.check_initialization().await;
            return Ok(None);
        };
        info!(%account, "Connected account");
        self.set_account(Some(account.clone()));
        if self.check_initialization().await.is_initialized() {
            self.refresh().await?;
        }
        Ok(Some(account))
    }

    /// Signs out. The session is kept if the wallet fails to sign out.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.wallet.sign_out().await?;
        info!("Signed out");
        self.set_account(None);
        Ok(())
    }

    pub async fn check_initialization(&self) -> InitializationStatus {
        let status = self
            .coordinator
            .reader()
            .initialization_status(&self.coordinator.config().contract_id)
            .await;
        *self
            .initialization
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(status.clone());
        status
    }

    /// Reloads the tokens of the connected account. On failure the list is left empty.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<Token>, SessionError> {
        let account = self.account().ok_or(SessionError::NotConnected)?;
        let result = self
            .coordinator
            .reader()
            .tokens_for_owner(&self.coordinator.config().contract_id, &account)
            .await;
        match result {
            Ok(tokens) => {
                self.set_tokens_for(&account, tokens.clone());
                Ok(tokens)
            }
            Err(error) => {
                warn!(%error, "Error fetching tokens");
                self.set_tokens_for(&account, Vec::new());
                Err(error.into())
            }
        }
    }

    pub async fn mint(&self, request: MintRequest) -> Result<Minted, SessionError> {
        let guard = BusyGuard::acquire(&self.busy)?;
        let result = self.mint_locked(request).await;
        drop(guard);
        result
    }

    /// Starts a mint in its own task. The busy flag is taken before this returns.
    pub fn spawn_mint(
        self: &Arc<Self>,
        request: MintRequest,
    ) -> Result<JoinHandle<Result<Minted, SessionError>>, SessionError> {
        let guard = BusyGuard::acquire(&self.busy)?;
        let manager = self.clone();
        Ok(tokio::spawn(async move {
            let result = manager.mint_locked(request).await;
            drop(guard);
            result
        }))
    }

    async fn mint_locked(&self, mut request: MintRequest) -> Result<Minted, SessionError> {
        let account = self.account();
        request.receiver_id = account.clone();
        let minted = self
            .coordinator
            .mint(request, self.wallet.as_ref(), self.store.as_ref())
            .await?;
        if let Some(account) = account {
            // A failed refresh leaves the list empty rather than stale.
            let tokens = minted.tokens.clone().unwrap_or_default();
            self.set_tokens_for(&account, tokens);
        }
        Ok(minted)
    }

    /// Calls `new_default_meta` with the connected account as owner, then probes the
    /// contract again and reloads the tokens.
    #[instrument(skip(self))]
    pub async fn initialize_contract(&self) -> Result<InitializationStatus, SessionError> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        if self.account().is_none() {
            return Err(SessionError::NotConnected);
        }
        let signer_id = self.wallet.signer_id().await?;
        let transaction = init_transaction(&self.coordinator.config().contract_id, &signer_id);
        info!(%signer_id, "Initializing NFT contract");
        self.wallet.sign_and_send_transaction(transaction).await?;
        let status = self.check_initialization().await;
        if let Err(error) = self.refresh().await {
            warn!(%error, "Could not load tokens after initialization");
        }
        Ok(status)
    }

    /// The tokens of the session, ready to display.
    pub fn gallery(&self) -> Vec<GalleryItem> {
        let gateway = &self.coordinator.config().pinata_gateway;
        self.tokens()
            .into_iter()
            .map(|token| GalleryItem {
                image_url: repair_media_url(token.media(), gateway),
                title: token.title().unwrap_or("Untitled").to_string(),
                description: token.description().unwrap_or("No description").to_string(),
                token_id: token.token_id,
            })
            .collect()
    }
}
