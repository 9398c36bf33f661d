// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use pinmint_core::config::{
    parse_endpoint_list, ConfigError, MintConfig, RawMintConfig, CONTRACT_ID_VAR,
    PINATA_GATEWAY_VAR, PINATA_JWT_VAR, RPC_ENDPOINTS_VAR,
};

#[derive(clap::Parser)]
#[command(
    name = "pinmint",
    version,
    about = "Pin media to IPFS and inspect the NFTs of a NEAR contract"
)]
pub struct PinmintOptions {
    #[command(flatten)]
    pub config: ConfigOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the client configuration comes from. Values given here override the file.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct ConfigOptions {
    /// A JSON configuration file.
    #[arg(long = "config", global = true)]
    pub config_file: Option<PathBuf>,

    /// The account the NFT contract is deployed to.
    #[arg(long, global = true, env = CONTRACT_ID_VAR)]
    pub contract_id: Option<String>,

    /// The host name of the IPFS gateway serving pinned media.
    #[arg(long, global = true, env = PINATA_GATEWAY_VAR)]
    pub pinata_gateway: Option<String>,

    /// The Pinata API token.
    #[arg(long, global = true, env = PINATA_JWT_VAR, hide_env_values = true)]
    pub pinata_jwt: Option<String>,

    /// Comma-separated RPC endpoints, in order of preference.
    #[arg(long, global = true, env = RPC_ENDPOINTS_VAR)]
    pub rpc_endpoints: Option<String>,

    /// Timeout of each RPC and upload request, in milliseconds.
    #[arg(long, global = true)]
    pub request_timeout_ms: Option<u64>,

    /// The Pinata upload API address.
    #[arg(long, global = true)]
    pub pinata_upload_url: Option<String>,
}

impl ConfigOptions {
    fn overrides(&self) -> RawMintConfig {
        RawMintConfig {
            contract_id: self.contract_id.clone(),
            pinata_gateway: self.pinata_gateway.clone(),
            pinata_jwt: self.pinata_jwt.clone(),
            rpc_endpoints: self.rpc_endpoints.as_deref().map(parse_endpoint_list),
            request_timeout_ms: self.request_timeout_ms,
            pinata_upload_url: self.pinata_upload_url.clone(),
        }
    }

    /// Merges the flags over the configuration file, if any, and validates the result.
    pub fn load(&self) -> Result<MintConfig, ConfigError> {
        let file = match &self.config_file {
            Some(path) => RawMintConfig::from_file(path)?,
            None => RawMintConfig::default(),
        };
        self.overrides().or(file).validate()
    }
}

#[derive(Clone, Debug, clap::Subcommand)]
pub enum Command {
    /// Print the first RPC endpoint that answers.
    Probe,

    /// Print whether the NFT contract is initialized.
    Status,

    /// Print the tokens of an account as JSON.
    Tokens {
        #[arg(long)]
        owner: String,
    },

    /// Pin a media file and print its gateway address.
    Upload {
        path: PathBuf,

        /// The account recorded as owner of the upload.
        #[arg(long)]
        owner: String,

        /// The name of the upload.
        #[arg(long)]
        title: String,
    },
}
