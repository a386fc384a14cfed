//! Blob-store collaborator: stores a named file and returns its handle.

use crate::config::StoreConfig;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Connection timeout for store uploads; large files take a while
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("blob store returned {status}: {body}")]
    Api { status: u16, body: String },
}

pub struct BlobStore {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl BlobStore {
    pub fn new(config: &StoreConfig) -> Self {
        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        }
    }

    /// Upload `bytes` under `name` and return the store's handle for it.
    pub async fn store(&self, name: &str, bytes: Vec<u8>) -> Result<serde_json::Value, StoreError> {
        let part = Part::bytes(bytes).file_name(name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.auth_token))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}
