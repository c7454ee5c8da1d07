//! Report storage service client
//!
//! One draft resource per `(council, year, month)`; PATCH creates the draft
//! on first call, POST `/submit` freezes it.

use super::ReportStore;
use async_trait::async_trait;
use pureum_common::api::{DraftId, DraftKey, ReportDraft, ReportPatch, REPORT_MONTHS};
use pureum_common::config::ReportApiConfig;
use std::time::Duration;
use thiserror::Error;

/// Report service client errors
#[derive(Debug, Error)]
pub enum ReportApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Report service error {0}: {1}")]
    Api(u16, String),

    #[error("Failed to parse report service response: {0}")]
    Parse(String),

    #[error("Report month {0} outside the accepted school-year range")]
    InvalidMonth(u32),
}

/// HTTP client for the report storage service
pub struct ReportApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ReportApiClient {
    pub fn new(config: &ReportApiConfig) -> Result<Self, ReportApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReportApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn draft_url(&self, key: &DraftKey) -> String {
        format!(
            "{}/councils/{}/reports/{}/{}",
            self.base_url, key.council_id, key.year, key.month
        )
    }

    /// The service only accepts school-year months; reject locally before
    /// issuing a request.
    fn check_month(key: &DraftKey) -> Result<(), ReportApiError> {
        if !REPORT_MONTHS.contains(&key.month) {
            return Err(ReportApiError::InvalidMonth(key.month));
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for ReportApiClient {
    async fn fetch(&self, key: &DraftKey) -> Result<Option<ReportDraft>, ReportApiError> {
        Self::check_month(key)?;

        let url = self.draft_url(key);
        tracing::debug!(key = %key, url = %url, "Fetching report draft");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ReportApiError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportApiError::Api(status.as_u16(), body));
        }

        let draft: ReportDraft = response
            .json()
            .await
            .map_err(|e| ReportApiError::Parse(e.to_string()))?;

        Ok(Some(draft))
    }

    async fn patch(
        &self,
        key: &DraftKey,
        patch: &ReportPatch,
    ) -> Result<ReportDraft, ReportApiError> {
        Self::check_month(key)?;

        let url = self.draft_url(key);
        tracing::debug!(key = %key, "Patching report draft");

        let response = self
            .http
            .patch(&url)
            .json(patch)
            .send()
            .await
            .map_err(|e| ReportApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportApiError::Api(status.as_u16(), body));
        }

        let draft: ReportDraft = response
            .json()
            .await
            .map_err(|e| ReportApiError::Parse(e.to_string()))?;

        tracing::info!(key = %key, draft_id = draft.id, "Report draft patched");
        Ok(draft)
    }

    async fn submit(&self, draft_id: DraftId) -> Result<ReportDraft, ReportApiError> {
        let url = format!("{}/reports/{}/submit", self.base_url, draft_id);
        tracing::debug!(draft_id, "Submitting report draft");

        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| ReportApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportApiError::Api(status.as_u16(), body));
        }

        let draft: ReportDraft = response
            .json()
            .await
            .map_err(|e| ReportApiError::Parse(e.to_string()))?;

        tracing::info!(draft_id, "Report draft submitted");
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pureum_common::api::DraftKey;

    fn test_client() -> ReportApiClient {
        ReportApiClient::new(&ReportApiConfig {
            base_url: "http://localhost:9/".to_string(),
            timeout_secs: 1,
        })
        .expect("client")
    }

    #[test]
    fn draft_url_strips_trailing_slash() {
        let client = test_client();
        let key = DraftKey::new(3, 2026, 5);
        assert_eq!(
            client.draft_url(&key),
            "http://localhost:9/councils/3/reports/2026/5"
        );
    }

    #[tokio::test]
    async fn out_of_range_month_is_rejected_before_any_request() {
        // port 9 (discard) would hang or refuse; the month check must fire first
        let client = test_client();
        let key = DraftKey::new(3, 2026, 2);
        match client.fetch(&key).await {
            Err(ReportApiError::InvalidMonth(2)) => {}
            other => panic!("expected InvalidMonth, got {:?}", other.map(|_| ())),
        }
        match client.patch(&key, &ReportPatch::default()).await {
            Err(ReportApiError::InvalidMonth(2)) => {}
            other => panic!("expected InvalidMonth, got {:?}", other.map(|_| ())),
        }
    }
}
