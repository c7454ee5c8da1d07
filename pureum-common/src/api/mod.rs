//! Shared API types for the companion services
//!
//! Request/response shapes exchanged with the report-storage, object-storage
//! and council-membership services. All wire names are camelCase to match the
//! service contracts.

mod types;

pub use types::{
    AttendanceRecord, AttendanceStatus, ConfirmationStatus, DraftId, DraftKey, LineItem, Member,
    ReceiptPayload, ReportDraft, ReportPatch, StoredPhoto, StoredReceipt, REPORT_MONTHS,
};
