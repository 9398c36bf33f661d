// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pinning of media files before they are referenced by a token.

use std::{collections::BTreeMap, path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::config::MintConfig;

/// Returns the gateway address of the content `cid`.
pub fn media_url(gateway: &str, cid: &str) -> String {
    format!("https://{gateway}/ipfs/{cid}")
}

/// A file selected locally for minting.
#[derive(Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for AssetFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetFile")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl AssetFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = fs_err::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "asset".to_string());
        Ok(Self { file_name, bytes })
    }

    /// Guesses the media type from the file extension.
    pub fn content_type(&self) -> &'static str {
        let extension = Path::new(&self.file_name)
            .extension()
            .map(|extension| extension.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("png") => "image/png",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("svg") => "image/svg+xml",
            _ => "application/octet-stream",
        }
    }
}

/// The name and key-value tags attached to an upload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UploadOptions {
    pub name: String,
    pub key_values: BTreeMap<String, String>,
}

impl UploadOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_values: BTreeMap::new(),
        }
    }

    pub fn with_key_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key_values.insert(key.into(), value.into());
        self
    }
}

/// A pinned file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub id: String,
    pub name: String,
    pub cid: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetStoreError {
    #[error("upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error("asset store error: {0}")]
    Other(String),
}

/// A content-addressed file store.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(
        &self,
        file: &AssetFile,
        options: &UploadOptions,
    ) -> Result<UploadedAsset, AssetStoreError>;
}

#[derive(Deserialize)]
struct PinataResponse {
    data: UploadedAsset,
}

/// Public uploads to Pinata through its v3 files API.
pub struct PinataStore {
    client: Client,
    upload_url: Url,
    jwt: String,
}

impl PinataStore {
    pub fn new(upload_url: Url, jwt: String, timeout: Duration) -> Result<Self, AssetStoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            upload_url,
            jwt,
        })
    }

    pub fn from_config(config: &MintConfig) -> Result<Self, AssetStoreError> {
        Self::new(
            config.pinata_upload_url.clone(),
            config.pinata_jwt.clone(),
            config.request_timeout,
        )
    }
}

#[async_trait]
impl AssetStore for PinataStore {
    #[instrument(skip_all, fields(file = %file.file_name, name = %options.name))]
    async fn upload(
        &self,
        file: &AssetFile,
        options: &UploadOptions,
    ) -> Result<UploadedAsset, AssetStoreError> {
        let url = self.upload_url.join("v3/files")?;
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.content_type())?;
        let form = Form::new()
            .part("file", part)
            .text("network", "public")
            .text("name", options.name.clone())
            .text("keyvalues", serde_json::to_string(&options.key_values)?);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|error| format!("Could not get response text: {error}"));
            return Err(AssetStoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let PinataResponse { data } = response.json().await?;
        debug!(cid = %data.cid, size = data.size, "File pinned");
        Ok(data)
    }
}
