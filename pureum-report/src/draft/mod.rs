//! The activity-report drafting pipeline
//!
//! Assembles free text, an attendance roster, photos and OCR-recognized
//! receipts into one draft that can be saved repeatedly and submitted
//! exactly once. Components, leaves first: the asset reconciliation stores,
//! the recognition pipeline, the attendance mirror, the sync controller,
//! and the submission orchestrator on top.

pub mod asset_store;
pub mod attendance;
pub mod loader;
pub mod ocr_pipeline;
pub mod submit;
pub mod sync;
pub mod workspace;

pub use asset_store::{AssetStore, KeptAsset, PendingAsset};
pub use attendance::AttendanceMirror;
pub use loader::DraftLoader;
pub use ocr_pipeline::{OcrOutcome, OcrPhase, OcrPipeline};
pub use submit::SubmissionOrchestrator;
pub use sync::DraftSyncController;
pub use workspace::{DraftFields, DraftWorkspace};
