//! # Pureum Common Library
//!
//! Shared code for the Pureum scholarship-companion client core including:
//! - API request/response types for the report, storage and membership services
//! - Event types (CompanionEvent enum) and the EventBus
//! - Configuration loading
//! - Error types
//! - Tracing initialization

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
