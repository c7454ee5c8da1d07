//! Object storage client
//!
//! Uploads one file per call and returns its publicly addressable URL.
//! Keys are `prefix/<uuid>.<ext>` so repeated uploads never collide.

use super::ObjectStorage;
use crate::models::LocalImage;
use async_trait::async_trait;
use pureum_common::config::StorageConfig;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Object storage client errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage rejected upload with status {0}: {1}")]
    Rejected(u16, String),

    #[error("Failed to parse storage response: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// HTTP client for the object storage service
pub struct ObjectStorageClient {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
}

impl ObjectStorageClient {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorageError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
        })
    }

    fn object_key(prefix: &str, image: &LocalImage) -> String {
        format!("{}/{}.{}", prefix, Uuid::new_v4(), image.extension())
    }
}

#[async_trait]
impl ObjectStorage for ObjectStorageClient {
    async fn upload(&self, prefix: &str, image: &LocalImage) -> Result<String, StorageError> {
        let key = Self::object_key(prefix, image);
        tracing::debug!(
            key = %key,
            bucket = %self.bucket,
            size = image.bytes.len(),
            "Uploading asset"
        );

        let part = reqwest::multipart::Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| StorageError::Parse(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("bucket", self.bucket.clone())
            .text("key", key.clone())
            .part("file", part);

        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected(status.as_u16(), body));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Parse(e.to_string()))?;

        tracing::info!(key = %key, url = %uploaded.url, "Asset uploaded");
        Ok(uploaded.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_are_unique_and_carry_the_extension() {
        let image = LocalImage::new("receipt.jpg", "image/jpeg", vec![1, 2, 3]);
        let first = ObjectStorageClient::object_key("reports/receipts", &image);
        let second = ObjectStorageClient::object_key("reports/receipts", &image);
        assert!(first.starts_with("reports/receipts/"));
        assert!(first.ends_with(".jpg"));
        assert_ne!(first, second);
    }
}
