//! Configuration loading for the companion client core
//!
//! Resolution priority order:
//! 1. Explicit path handed in by the embedding shell (highest priority)
//! 2. `PUREUM_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/pureum/config.toml`)
//! 4. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Report-storage service settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReportApiConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

/// Object-storage service settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub base_url: String,
    pub bucket: String,
    #[serde(default = "default_photo_prefix")]
    pub photo_prefix: String,
    #[serde(default = "default_receipt_prefix")]
    pub receipt_prefix: String,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

/// Receipt-recognition settings
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub remote_url: String,
    /// Transport timeout for the remote provider's own request
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
    /// Ceiling timeout for the whole remote-then-local sequence,
    /// independent of either provider's own timeout
    #[serde(default = "default_ceiling_timeout_ms")]
    pub ceiling_timeout_ms: u64,
    /// Language pack passed to the local tesseract fallback
    #[serde(default = "default_tesseract_lang")]
    pub tesseract_lang: String,
}

/// Per-draft asset count ceilings
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_assets")]
    pub max_photos: usize,
    #[serde(default = "default_max_assets")]
    pub max_receipts: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_photos: default_max_assets(),
            max_receipts: default_max_assets(),
        }
    }
}

/// Full companion configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CompanionConfig {
    pub report_api: ReportApiConfig,
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_ceiling_timeout_ms() -> u64 {
    20_000
}

fn default_tesseract_lang() -> String {
    "kor+eng".to_string()
}

fn default_max_assets() -> usize {
    10
}

fn default_photo_prefix() -> String {
    "reports/photos".to_string()
}

fn default_receipt_prefix() -> String {
    "reports/receipts".to_string()
}

impl CompanionConfig {
    /// Load configuration following the priority order documented at the
    /// top of this module.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // Priority 1: explicit path from the embedding shell
        if let Some(path) = explicit_path {
            tracing::info!(path = %path.display(), "Loading configuration from explicit path");
            return Self::from_file(path);
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var("PUREUM_CONFIG") {
            tracing::info!(path = %path, "Loading configuration from PUREUM_CONFIG");
            return Self::from_file(Path::new(&path));
        }

        // Priority 3: platform config directory
        if let Some(path) = Self::platform_config_path() {
            if path.exists() {
                tracing::info!(path = %path.display(), "Loading configuration from config dir");
                return Self::from_file(&path);
            }
        }

        // Priority 4: compiled defaults
        tracing::info!("No configuration file found, using compiled defaults");
        Ok(Self::compiled_default())
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// `<config_dir>/pureum/config.toml` for the current platform
    pub fn platform_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("pureum").join("config.toml"))
    }

    /// Defaults pointing at the production service endpoints
    pub fn compiled_default() -> Self {
        Self {
            report_api: ReportApiConfig {
                base_url: "https://api.pureum.or.kr".to_string(),
                timeout_secs: default_request_timeout_secs(),
            },
            storage: StorageConfig {
                base_url: "https://storage.pureum.or.kr".to_string(),
                bucket: "pureum-uploads".to_string(),
                photo_prefix: default_photo_prefix(),
                receipt_prefix: default_receipt_prefix(),
                timeout_secs: default_request_timeout_secs(),
            },
            ocr: OcrConfig {
                remote_url: "https://ocr.pureum.or.kr".to_string(),
                timeout_secs: default_request_timeout_secs(),
                ceiling_timeout_ms: default_ceiling_timeout_ms(),
                tesseract_lang: default_tesseract_lang(),
            },
            limits: LimitsConfig::default(),
        }
    }

    pub fn ceiling_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ocr.ceiling_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [report_api]
        base_url = "http://localhost:8080"

        [storage]
        base_url = "http://localhost:8081"
        bucket = "test-uploads"

        [ocr]
        remote_url = "http://localhost:8082"
    "#;

    #[test]
    fn minimal_toml_fills_defaults() {
        let config: CompanionConfig = toml::from_str(MINIMAL).expect("parse");
        assert_eq!(config.report_api.timeout_secs, 30);
        assert_eq!(config.ocr.ceiling_timeout_ms, 20_000);
        assert_eq!(config.ocr.tesseract_lang, "kor+eng");
        assert_eq!(config.limits.max_photos, 10);
        assert_eq!(config.limits.max_receipts, 10);
        assert_eq!(config.storage.photo_prefix, "reports/photos");
    }

    #[test]
    fn explicit_limits_override_defaults() {
        let toml = format!("{}\n[limits]\nmax_photos = 5\n", MINIMAL);
        let config: CompanionConfig = toml::from_str(&toml).expect("parse");
        assert_eq!(config.limits.max_photos, 5);
        assert_eq!(config.limits.max_receipts, 10);
    }

    #[test]
    #[serial]
    fn explicit_path_beats_environment() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(MINIMAL.as_bytes()).expect("write");

        std::env::set_var("PUREUM_CONFIG", "/nonexistent/pureum.toml");
        let config = CompanionConfig::load(Some(file.path())).expect("load");
        std::env::remove_var("PUREUM_CONFIG");

        assert_eq!(config.report_api.base_url, "http://localhost:8080");
    }

    #[test]
    #[serial]
    fn missing_env_file_is_an_error() {
        std::env::set_var("PUREUM_CONFIG", "/nonexistent/pureum.toml");
        let result = CompanionConfig::load(None);
        std::env::remove_var("PUREUM_CONFIG");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn compiled_default_is_self_consistent() {
        let config = CompanionConfig::compiled_default();
        assert!(config.ceiling_timeout().as_millis() > 0);
        assert!(config.limits.max_photos > 0);
    }
}
