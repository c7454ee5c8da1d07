//! # Pureum Report Core
//!
//! Client-side drafting core for the monthly council activity report:
//! asset reconciliation, receipt recognition with a local fallback, the
//! attendance mirror, and the save/submit orchestration over the report,
//! storage and membership services.

pub mod draft;
pub mod models;
pub mod services;

pub use draft::{
    AttendanceMirror, DraftLoader, DraftSyncController, DraftWorkspace, OcrOutcome, OcrPipeline,
    SubmissionOrchestrator,
};
pub use pureum_common::{Error, Result};
