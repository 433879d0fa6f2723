//! Shared library for the catalog ingestion workspace.
//!
//! This crate provides common functionality used by the ingestion binary:
//! - Configuration management
//! - Data models for candidates, catalog entries and run summaries
//! - The local SQLite catalog store
//! - Logging infrastructure
//! - Shared error types

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use catalog::CatalogStore;
pub use config::Config;
pub use db::Database;
pub use error::CatalogError;
pub use logging::LogConfig;
pub use models::*;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
