//! Catalog interfaces.
//!
//! The pipeline reads the existing catalog through [`CatalogReader`] and
//! creates entries through [`CatalogWriter`]. Two backends are provided: the
//! local SQLite store and a remote HTTP catalog.

pub mod http;
pub mod sqlite;

pub use http::HttpCatalog;
pub use sqlite::SqliteCatalog;

use async_trait::async_trait;
use shared::{CatalogError, CatalogPage, NewCatalogEntry};

/// Paginated read access to the existing catalog
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// One page of entries; `page` is 1-based
    async fn list_page(&self, page: u32, page_size: u32) -> Result<CatalogPage, CatalogError>;
}

/// Write access to the catalog
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    /// Create an entry, returning its id
    ///
    /// A uniqueness violation is reported as [`CatalogError::DuplicateConflict`].
    async fn create(&self, entry: &NewCatalogEntry) -> Result<i64, CatalogError>;
}
