//! Local receipt-recognition fallback
//!
//! Drives the `tesseract` command-line tool over a temp copy of the image
//! and parses label/amount pairs out of the raw text. Used only after the
//! remote provider has failed, never in parallel with it.

use super::OcrProvider;
use crate::models::LocalImage;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use pureum_common::api::LineItem;
use pureum_common::config::OcrConfig;
use regex::Regex;
use std::io::Write;
use std::process::Command;
use thiserror::Error;

/// Tesseract client errors
#[derive(Debug, Error)]
pub enum TesseractError {
    /// tesseract binary not found in PATH
    #[error("tesseract binary not found in PATH")]
    BinaryNotFound,

    /// Failed to execute the tesseract command
    #[error("Failed to execute tesseract: {0}")]
    Execution(String),

    /// I/O error (temp file write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A receipt line: anything before a trailing integer amount (with optional
/// thousands separators and a 원 suffix) is the label.
static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<label>.+?)[\s.·]*(?P<amount>\d{1,3}(?:,\d{3})+|\d{3,})\s*원?\s*$")
        .expect("line pattern is valid")
});

/// Total rows printed on the receipt itself; excluded so they do not get
/// double-counted against the item sum.
static TOTAL_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)합\s*계|총\s*액|total|소\s*계").expect("total pattern is valid"));

/// Local OCR fallback over the tesseract CLI
pub struct TesseractOcr {
    lang: String,
}

impl TesseractOcr {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.tesseract_lang.clone())
    }

    fn run(&self, image: &LocalImage) -> Result<String, TesseractError> {
        let mut tmp = tempfile::Builder::new()
            .suffix(&format!(".{}", image.extension()))
            .tempfile()?;
        tmp.write_all(&image.bytes)?;

        let output = Command::new("tesseract")
            .arg(tmp.path())
            .arg("stdout")
            .args(["-l", &self.lang, "--psm", "6"])
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TesseractError::BinaryNotFound
                } else {
                    TesseractError::Execution(e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(TesseractError::Execution(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse recognized text into ordered line items, skipping rows without an
/// amount and the receipt's own total rows.
fn parse_line_items(text: &str) -> Vec<LineItem> {
    let mut items = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(captures) = LINE_PATTERN.captures(line) else {
            continue;
        };
        let label = captures["label"].trim().to_string();
        if label.is_empty() || TOTAL_LABEL.is_match(&label) {
            continue;
        }
        let amount: i64 = match captures["amount"].replace(',', "").parse() {
            Ok(amount) if amount > 0 => amount,
            _ => continue,
        };
        items.push(LineItem { label, amount });
    }
    items
}

#[async_trait]
impl OcrProvider for TesseractOcr {
    fn provider_id(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        Command::new("tesseract")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn recognize(&self, image: &LocalImage) -> anyhow::Result<Vec<LineItem>> {
        let text = self.run(image)?;
        let items = parse_line_items(&text);
        tracing::debug!(
            file = %image.file_name,
            item_count = items.len(),
            "Local recognition finished"
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_korean_receipt_lines() {
        let text = "\
김밥천국 영수증
식비 ...... 15,000원
음료 3000
합계 18,000원
2026-04-12
";
        let items = parse_line_items(text);
        assert_eq!(
            items,
            vec![
                LineItem {
                    label: "식비".to_string(),
                    amount: 15000,
                },
                LineItem {
                    label: "음료".to_string(),
                    amount: 3000,
                },
            ]
        );
    }

    #[test]
    fn skips_totals_and_lines_without_amounts() {
        let text = "총액 99,000\nTOTAL 99000\n안녕하세요\n";
        assert!(parse_line_items(text).is_empty());
    }

    #[test]
    fn empty_text_yields_empty_items_not_an_error() {
        assert!(parse_line_items("").is_empty());
    }

    #[test]
    fn preserves_reading_order() {
        let text = "a간식 1,000\nb기자재 2,000\nc교통비 3,000\n";
        let labels: Vec<_> = parse_line_items(text)
            .into_iter()
            .map(|item| item.label)
            .collect();
        assert_eq!(labels, vec!["a간식", "b기자재", "c교통비"]);
    }
}
