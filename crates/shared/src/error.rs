//! Error types shared by the catalog interfaces.

use thiserror::Error;

/// Errors returned by the catalog read and write interfaces
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog's own uniqueness check rejected the entry
    #[error("catalog already contains an entry with the same {field}")]
    DuplicateConflict { field: String },

    /// Local storage failure
    #[error("catalog storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Remote catalog returned an unexpected response
    #[error("catalog request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CatalogError::DuplicateConflict { .. })
    }
}
