//! Editing-side models for the draft pipeline
//!
//! Wire types shared with the services live in `pureum_common::api`; this
//! module holds the local-only shapes that exist while a draft is being
//! edited, before anything is uploaded.

use bytes::Bytes;
use pureum_common::api::LineItem;

/// A locally selected file that has not been uploaded yet.
///
/// Bytes are reference-counted, so cloning an image for a save snapshot is
/// cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl LocalImage {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// File extension for the storage key, derived from the content type
    /// (the device picker reports it; file names are not trusted).
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/heic" => "heic",
            _ => "bin",
        }
    }
}

/// A locally added receipt image plus the line items recognition has
/// attached to it so far (empty until an extraction is applied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReceipt {
    pub image: LocalImage,
    pub items: Vec<LineItem>,
    /// Generation ticket of the extraction started when this receipt was
    /// added; late recognition results are matched back through it.
    pub ticket: u64,
}

impl PendingReceipt {
    pub fn new(image: LocalImage, ticket: u64) -> Self {
        Self {
            image,
            items: Vec::new(),
            ticket,
        }
    }

    /// Sum of the recognized amounts
    pub fn item_total(&self) -> i64 {
        self.items.iter().map(|item| item.amount).sum()
    }
}
