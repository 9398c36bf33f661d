// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The wallet seam: whoever holds the keys signs and broadcasts our transactions.

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

const TERA: u64 = 1_000_000_000_000;
const YOCTO_PER_MILLINEAR: u128 = 1_000_000_000_000_000_000_000;

/// An amount of gas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gas(pub u64);

impl Gas {
    pub const fn from_tgas(tgas: u64) -> Self {
        Self(tgas * TERA)
    }
}

/// An amount of the native token, in yoctoNEAR.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Balance(pub u128);

impl Balance {
    pub const ZERO: Balance = Balance(0);

    pub const fn from_millinear(millinear: u128) -> Self {
        Self(millinear * YOCTO_PER_MILLINEAR)
    }
}

macro_rules! impl_decimal_string {
    ($name:ident, $inner:ty) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse::<$inner>()?))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(de::Error::custom)
            }
        }
    };
}

impl_decimal_string!(Gas, u64);
impl_decimal_string!(Balance, u128);

/// The arguments of a contract method call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: Value,
    pub gas: Gas,
    pub deposit: Balance,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Action {
    FunctionCall(FunctionCallAction),
}

/// A transaction as handed to a wallet for signing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub signer_id: String,
    pub receiver_id: String,
    pub actions: Vec<Action>,
}

impl Transaction {
    /// A transaction with a single function call.
    pub fn function_call(
        signer_id: impl Into<String>,
        receiver_id: impl Into<String>,
        method_name: impl Into<String>,
        args: Value,
        gas: Gas,
        deposit: Balance,
    ) -> Self {
        Self {
            signer_id: signer_id.into(),
            receiver_id: receiver_id.into(),
            actions: vec![Action::FunctionCall(FunctionCallAction {
                method_name: method_name.into(),
                args,
                gas,
                deposit,
            })],
        }
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCallAction> {
        self.actions.iter().map(|action| match action {
            Action::FunctionCall(call) => call,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl WalletAccount {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            public_key: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("the user rejected the request")]
    Rejected,
    #[error("the wallet has no signed-in account")]
    NoAccount,
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    #[error("wallet error: {0}")]
    Other(String),
}

/// A wallet able to sign and broadcast transactions for its accounts. Signing may wait
/// for the user to approve the request.
#[async_trait]
pub trait LedgerWallet: Send + Sync {
    async fn get_accounts(&self) -> Result<Vec<WalletAccount>, WalletError>;

    /// Signs `transaction`, broadcasts it and waits for its outcome.
    async fn sign_and_send_transaction(&self, transaction: Transaction)
        -> Result<Value, WalletError>;

    async fn sign_out(&self) -> Result<(), WalletError>;

    /// The account transactions are signed with.
    async fn signer_id(&self) -> Result<String, WalletError> {
        self.get_accounts()
            .await?
            .into_iter()
            .next()
            .map(|account| account.account_id)
            .filter(|account_id| !account_id.is_empty())
            .ok_or(WalletError::NoAccount)
    }
}

/// Lets the user pick a wallet and sign in.
pub trait ModalController: Send + Sync {
    fn show(&self);
}
