// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use assert_matches::assert_matches;
use axum::{
    extract::{Multipart, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use pinmint_core::{
    asset_store::{AssetStoreError, UploadOptions},
    AssetFile, AssetStore, PinataStore,
};
use serde_json::json;
use tokio::net::TcpListener;
use url::Url;

#[derive(Default)]
struct Received {
    authorization: Option<String>,
    fields: BTreeMap<String, String>,
    file: Option<(String, Vec<u8>)>,
}

#[derive(Clone)]
struct PinataState {
    received: Arc<Mutex<Received>>,
    accept: bool,
}

async fn upload(
    State(state): State<PinataState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut received = Received {
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(String::from),
        ..Received::default()
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap().to_vec();
            received.file = Some((file_name, bytes));
        } else {
            received.fields.insert(name, field.text().await.unwrap());
        }
    }
    *state.received.lock().unwrap() = received;
    if !state.accept {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    Json(json!({
        "data": {
            "id": "0195f3f1",
            "name": "Cat",
            "cid": "bafy123",
            "size": 3,
            "mime_type": "image/png",
        }
    }))
    .into_response()
}

async fn spawn_pinata(accept: bool) -> (Url, Arc<Mutex<Received>>) {
    let received = Arc::new(Mutex::new(Received::default()));
    let app = Router::new()
        .route("/v3/files", post(upload))
        .with_state(PinataState {
            received: received.clone(),
            accept,
        });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{address}/").parse().unwrap(), received)
}

fn options() -> UploadOptions {
    UploadOptions::new("Cat")
        .with_key_value("type", "nft-media")
        .with_key_value("owner", "alice.testnet")
}

#[tokio::test]
async fn test_upload_sends_public_multipart_form() -> anyhow::Result<()> {
    let (url, received) = spawn_pinata(true).await;
    let store = PinataStore::new(url, "test-jwt".to_string(), Duration::from_secs(5))?;

    let asset = store
        .upload(&AssetFile::new("img.png", b"png".to_vec()), &options())
        .await?;
    assert_eq!(asset.cid, "bafy123");
    assert_eq!(asset.size, 3);

    let received = received.lock().unwrap();
    assert_eq!(received.authorization.as_deref(), Some("Bearer test-jwt"));
    assert_eq!(
        received.file,
        Some(("img.png".to_string(), b"png".to_vec()))
    );
    assert_eq!(received.fields["network"], "public");
    assert_eq!(received.fields["name"], "Cat");
    let key_values: serde_json::Value = serde_json::from_str(&received.fields["keyvalues"])?;
    assert_eq!(
        key_values,
        json!({ "type": "nft-media", "owner": "alice.testnet" })
    );
    Ok(())
}

#[tokio::test]
async fn test_rejected_upload_keeps_status_and_body() -> anyhow::Result<()> {
    let (url, _received) = spawn_pinata(false).await;
    let store = PinataStore::new(url, "wrong-jwt".to_string(), Duration::from_secs(5))?;

    let result = store
        .upload(&AssetFile::new("img.png", b"png".to_vec()), &options())
        .await;
    assert_matches!(
        result,
        Err(AssetStoreError::Rejected { status: 401, body }) if body == "invalid token"
    );
    Ok(())
}
