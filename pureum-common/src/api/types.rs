//! Wire types for the monthly activity-report draft

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Server-assigned draft identity, absent until the first successful save
pub type DraftId = i64;

/// Months for which the report service accepts drafts (school year, April-December)
pub const REPORT_MONTHS: RangeInclusive<u32> = 4..=12;

/// Identity of one monthly draft resource: one draft per (council, year, month)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftKey {
    pub council_id: i64,
    pub year: i32,
    pub month: u32,
}

impl DraftKey {
    pub fn new(council_id: i64, year: i32, month: u32) -> Self {
        Self {
            council_id,
            year,
            month,
        }
    }

    /// The report service only accepts months inside the school year;
    /// callers must not issue requests outside that range.
    pub fn validate(&self) -> crate::Result<()> {
        if !REPORT_MONTHS.contains(&self.month) {
            return Err(crate::Error::InvalidInput(format!(
                "report month must be within {}..={}, got {}",
                REPORT_MONTHS.start(),
                REPORT_MONTHS.end(),
                self.month
            )));
        }
        Ok(())
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{:02}", self.council_id, self.year, self.month)
    }
}

/// Per-member attendance state inside a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// Whether the member has confirmed the record (changed by collaborators
/// after submission, never by this client)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
}

/// One attendance row; `user_id` is unique within a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub user_id: i64,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub status: AttendanceStatus,
    pub confirmation: ConfirmationStatus,
    pub is_leader: bool,
}

/// One council member, as returned by the membership service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: i64,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_leader: bool,
}

impl Member {
    /// Default attendance row seeded for a council member when the draft
    /// has no prior attendance.
    pub fn default_attendance(&self) -> AttendanceRecord {
        AttendanceRecord {
            user_id: self.user_id,
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
            status: AttendanceStatus::Present,
            confirmation: ConfirmationStatus::Pending,
            is_leader: self.is_leader,
        }
    }
}

/// One recognized label/amount pair from a receipt (amounts in won)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub label: String,
    pub amount: i64,
}

/// A server-persisted photo the user has chosen to keep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPhoto {
    pub id: i64,
    pub url: String,
}

/// A server-persisted receipt with its recognized line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReceipt {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

/// The server's view of one monthly report draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDraft {
    pub id: DraftId,
    pub title: Option<String>,
    pub activity_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub content: Option<String>,
    pub total_cost: Option<i64>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default)]
    pub photos: Vec<StoredPhoto>,
    #[serde(default)]
    pub receipts: Vec<StoredReceipt>,
    pub is_submitted: bool,
}

/// One receipt entry inside a save patch: the (kept or freshly uploaded)
/// image URL plus its line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPayload {
    pub image_url: String,
    pub items: Vec<LineItem>,
}

/// The single PATCH body assembled by one save.
///
/// Free-text fields the user never touched serialize as absent rather than
/// empty, so the server does not overwrite existing values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<i64>,
    pub image_urls: Vec<String>,
    pub receipts: Vec<ReceiptPayload>,
    pub attendance: Vec<AttendanceRecord>,
}
