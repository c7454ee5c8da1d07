//! Service collaborators consumed by the draft pipeline
//!
//! Each backend service is reached through a narrow trait so the pipeline
//! can be exercised against in-process doubles; the HTTP implementations
//! live in the submodules.

use crate::models::LocalImage;
use async_trait::async_trait;
use pureum_common::api::{DraftId, DraftKey, LineItem, Member, ReportDraft, ReportPatch};

pub mod membership;
pub mod object_storage;
pub mod ocr_remote;
pub mod ocr_tesseract;
pub mod report_api;

pub use membership::{MembershipClient, MembershipError};
pub use object_storage::{ObjectStorageClient, StorageError};
pub use ocr_remote::RemoteOcrClient;
pub use ocr_tesseract::TesseractOcr;
pub use report_api::{ReportApiClient, ReportApiError};

/// Report storage service: one draft per `(council, year, month)`.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Fetch the current draft, or `None` when no save has created one yet
    async fn fetch(&self, key: &DraftKey) -> Result<Option<ReportDraft>, ReportApiError>;

    /// Send one patch; the first patch for a key creates the draft and the
    /// server assigns its id
    async fn patch(&self, key: &DraftKey, patch: &ReportPatch)
        -> Result<ReportDraft, ReportApiError>;

    /// Submit a previously saved draft; the server freezes it afterwards
    async fn submit(&self, draft_id: DraftId) -> Result<ReportDraft, ReportApiError>;
}

/// Object storage: accepts one file, returns its public URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, prefix: &str, image: &LocalImage) -> Result<String, StorageError>;
}

/// One receipt-recognition provider.
///
/// The pipeline tries the remote provider first and the local fallback
/// second, never both in parallel. Zero recognized items is a success, not
/// an error.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Provider identifier for logging and events (e.g. "remote", "tesseract")
    fn provider_id(&self) -> &'static str;

    /// Whether the provider can run at all (binary installed, endpoint
    /// configured). Unavailable providers are skipped with a warning.
    fn is_available(&self) -> bool {
        true
    }

    /// Recognize the line items on one receipt image, in reading order
    async fn recognize(&self, image: &LocalImage) -> anyhow::Result<Vec<LineItem>>;
}

/// Council membership service, used only to seed attendance when a draft
/// has none.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn members(&self, council_id: i64) -> Result<Vec<Member>, MembershipError>;
}
