// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Error};
use clap::Parser;
use pinmint_core::{
    asset_store::UploadOptions, mint::MEDIA_TYPE_TAG, AssetFile, AssetStore as _, MintConfig,
    PinataStore,
};
use pinmint_ledger::common::InitializationStatus;
use pinmint_service::options::{Command, PinmintOptions};
use tracing::info;

async fn run(config: MintConfig, command: Command) -> Result<(), Error> {
    match command {
        Command::Probe => {
            let selected = config.endpoint_selector().select().await?;
            info!(
                chain_id = %selected.status.chain_id,
                block_height = selected.status.sync_info.latest_block_height,
                "Node is live"
            );
            println!("{}", selected.endpoint);
        }

        Command::Status => {
            let status = config
                .ledger_reader()
                .initialization_status(&config.contract_id)
                .await;
            match status {
                InitializationStatus::Initialized(metadata) => {
                    println!("{}", serde_json::to_string_pretty(&metadata)?)
                }
                InitializationStatus::NotInitialized => {
                    println!("{} is not initialized", config.contract_id)
                }
                InitializationStatus::Unknown => {
                    anyhow::bail!("could not determine the state of {}", config.contract_id)
                }
            }
        }

        Command::Tokens { owner } => {
            let tokens = config
                .ledger_reader()
                .tokens_for_owner(&config.contract_id, &owner)
                .await?;
            info!(%owner, count = tokens.len(), "Loaded tokens");
            println!("{}", serde_json::to_string_pretty(&tokens)?);
        }

        Command::Upload { path, owner, title } => {
            let file = AssetFile::from_path(&path)
                .with_context(|| format!("could not read {}", path.display()))?;
            let store = PinataStore::from_config(&config)?;
            let options = UploadOptions::new(title)
                .with_key_value("type", MEDIA_TYPE_TAG)
                .with_key_value("owner", owner);
            let asset = store.upload(&file, &options).await?;
            info!(cid = %asset.cid, size = asset.size, "Uploaded");
            println!("{}", config.media_url(&asset.cid));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    pinmint_service::tracing::init("pinmint")?;

    let options = PinmintOptions::parse();
    let config = options
        .config
        .load()
        .context("invalid pinmint configuration")?;
    info!(?config, "Starting");

    run(config, options.command).await
}
