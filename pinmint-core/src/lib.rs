// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! This module coordinates uploading media, minting it as an NFT through a wallet, and
//! keeping the owner's collection in view.

pub mod asset_store;
pub mod config;
pub mod mint;
pub mod session;
pub mod wallet;

/// Helper types for tests.
#[cfg(feature = "test")]
pub mod test_utils;

#[cfg(test)]
#[path = "unit_tests/config_tests.rs"]
mod config_tests;

#[cfg(test)]
#[path = "unit_tests/mint_tests.rs"]
mod mint_tests;

#[cfg(test)]
#[path = "unit_tests/session_tests.rs"]
mod session_tests;

pub use crate::{
    asset_store::{AssetFile, AssetStore, PinataStore},
    config::{MintConfig, RawMintConfig},
    mint::{MintCoordinator, MintError, MintRequest, MintState, Minted},
    session::{SessionError, SessionManager},
    wallet::{LedgerWallet, ModalController, Transaction},
};
