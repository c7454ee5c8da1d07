//! Remote receipt-recognition client
//!
//! Best-effort hosted OCR service. Cold starts can stall for a long time,
//! so the pipeline applies its own ceiling timeout on top of the transport
//! timeout configured here.

use super::OcrProvider;
use crate::models::LocalImage;
use async_trait::async_trait;
use pureum_common::api::LineItem;
use pureum_common::config::OcrConfig;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Remote recognition client errors
#[derive(Debug, Error)]
pub enum RemoteOcrError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Recognition service error {0}: {1}")]
    Api(u16, String),

    #[error("Failed to parse recognition response: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    items: Vec<RecognizedItem>,
}

#[derive(Debug, Deserialize)]
struct RecognizedItem {
    label: String,
    amount: i64,
}

/// HTTP client for the hosted recognition service
pub struct RemoteOcrClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteOcrClient {
    pub fn new(config: &OcrConfig) -> Result<Self, RemoteOcrError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteOcrError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.remote_url.trim_end_matches('/').to_string(),
        })
    }

    async fn request(&self, image: &LocalImage) -> Result<Vec<LineItem>, RemoteOcrError> {
        let part = reqwest::multipart::Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| RemoteOcrError::Parse(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .http
            .post(format!("{}/v1/recognize", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RemoteOcrError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteOcrError::Api(status.as_u16(), body));
        }

        let recognized: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| RemoteOcrError::Parse(e.to_string()))?;

        Ok(recognized
            .items
            .into_iter()
            .map(|item| LineItem {
                label: item.label,
                amount: item.amount,
            })
            .collect())
    }
}

#[async_trait]
impl OcrProvider for RemoteOcrClient {
    fn provider_id(&self) -> &'static str {
        "remote"
    }

    async fn recognize(&self, image: &LocalImage) -> anyhow::Result<Vec<LineItem>> {
        let items = self.request(image).await?;
        tracing::debug!(
            file = %image.file_name,
            item_count = items.len(),
            "Remote recognition finished"
        );
        Ok(items)
    }
}
