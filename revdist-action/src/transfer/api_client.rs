//! Transfer system REST client
//!
//! # API Reference
//! - Find: `POST {server}/api/v2/{entity}/find` with `{"expression": ...}`
//! - Create: `POST {server}/api/v2/{entity}/create` with the entity data
//! - Responses wrap their payload as `{"result": ...}`; failures carry
//!   `{"message": ...}`
//! - Auth: `Authorization: ASCredentials base64(username:api_key)`

use super::{TransferConnector, TransferSystem};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, Client};
use revdist_common::config::TransferConfig;
use revdist_common::models::{quote, str_field, Share, TransferJob};
use revdist_common::{Error, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Transfer system API client
pub struct TransferApiClient {
    http_client: Client,
    api_url: String,
}

impl TransferApiClient {
    pub fn new(config: &TransferConfig) -> Result<Self> {
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", config.username, config.api_key));
        let mut auth = header::HeaderValue::from_str(&format!("ASCredentials {}", credentials))
            .map_err(|e| Error::Config(format!("Invalid transfer credentials: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        Ok(Self {
            http_client: Client::builder().default_headers(headers).build()?,
            api_url: format!("{}/api/v2", config.server_url.trim_end_matches('/')),
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, uri: &str, body: &T) -> Result<Value> {
        let url = format!("{}/{}", self.api_url, uri);
        debug!(url = %url, "Transfer API request");

        let response = self.http_client.post(&url).json(body).send().await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no details");
            return Err(Error::Remote(format!(
                "Transfer API returned error {}: {}",
                status, message
            )));
        }
        unwrap_result(body)
    }
}

#[async_trait]
impl TransferSystem for TransferApiClient {
    async fn find_share(&self, code: &str) -> Result<Option<Share>> {
        let result = self
            .post(
                "share/find",
                &json!({ "expression": format!("code={}", quote(code)) }),
            )
            .await?;
        match result {
            Value::Array(records) => records.first().map(Share::from_record).transpose(),
            Value::Null => Ok(None),
            other => Err(Error::Remote(format!("Unexpected share lookup result: {}", other))),
        }
    }

    async fn create_share(&self, code: &str, path: &str) -> Result<Share> {
        let result = self
            .post("share/create", &json!({ "code": code, "path": path }))
            .await?;
        Share::from_record(&result)
    }

    async fn create_job(&self, job: &TransferJob) -> Result<String> {
        let result = self.post("job/create", job).await?;
        str_field(&result, "Job", "id")
    }
}

/// Opens a new [`TransferApiClient`] per call
pub struct TransferApiConnector {
    config: TransferConfig,
}

impl TransferApiConnector {
    pub fn new(config: TransferConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransferConnector for TransferApiConnector {
    async fn connect(&self) -> Result<Arc<dyn TransferSystem>> {
        Ok(Arc::new(TransferApiClient::new(&self.config)?))
    }
}

fn unwrap_result(body: Value) -> Result<Value> {
    match body {
        Value::Object(mut obj) => obj
            .remove("result")
            .ok_or_else(|| Error::field_missing("Response", "result")),
        _ => Err(Error::field_missing("Response", "result")),
    }
}
