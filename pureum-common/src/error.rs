//! Common error types for the Pureum client core

use thiserror::Error;

/// Common result type for Pureum operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the companion client core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Asset upload to object storage failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Report storage service rejected a request
    #[error("Report service error: {0}")]
    ReportApi(String),

    /// Operation rejected because another one is still in flight
    #[error("Operation already in flight: {0}")]
    Busy(&'static str),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
