//! Council membership client
//!
//! Used only to seed attendance when a draft has no prior roster.

use super::MembershipDirectory;
use async_trait::async_trait;
use pureum_common::api::Member;
use pureum_common::config::ReportApiConfig;
use std::time::Duration;
use thiserror::Error;

/// Membership client errors
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Membership service error {0}: {1}")]
    Api(u16, String),

    #[error("Failed to parse membership response: {0}")]
    Parse(String),
}

/// HTTP client for the council membership service
pub struct MembershipClient {
    http: reqwest::Client,
    base_url: String,
}

impl MembershipClient {
    pub fn new(config: &ReportApiConfig) -> Result<Self, MembershipError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MembershipError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MembershipDirectory for MembershipClient {
    async fn members(&self, council_id: i64) -> Result<Vec<Member>, MembershipError> {
        let url = format!("{}/councils/{}/members", self.base_url, council_id);
        tracing::debug!(council_id, "Fetching council members");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MembershipError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MembershipError::Api(status.as_u16(), body));
        }

        let members: Vec<Member> = response
            .json()
            .await
            .map_err(|e| MembershipError::Parse(e.to_string()))?;

        tracing::debug!(council_id, count = members.len(), "Council members fetched");
        Ok(members)
    }
}
