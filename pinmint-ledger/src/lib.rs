// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! This module provides read access to a NEAR-style NFT contract through the first live
//! endpoint of an ordered list of JSON-RPC nodes.

pub mod client;
pub mod common;
pub mod endpoint;
pub mod provider;
pub mod reader;

/// Helper types for tests.
#[cfg(feature = "test")]
pub mod test_utils;

#[cfg(test)]
#[path = "unit_tests/client_tests.rs"]
mod client_tests;

pub use crate::{
    common::{Endpoint, LedgerServiceError, Token, TokenMetadata},
    endpoint::{EndpointSelector, HttpConnector},
    reader::LedgerReader,
};
