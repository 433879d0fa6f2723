//! Catalog interfaces over the local SQLite store.

use super::{CatalogReader, CatalogWriter};
use anyhow::anyhow;
use async_trait::async_trait;
use shared::{CatalogError, CatalogPage, CatalogStore, NewCatalogEntry};
use std::sync::{Mutex, MutexGuard};

/// Local catalog backend
pub struct SqliteCatalog {
    store: Mutex<CatalogStore>,
}

impl SqliteCatalog {
    pub fn new(store: CatalogStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CatalogStore>, CatalogError> {
        self.store
            .lock()
            .map_err(|_| CatalogError::Other(anyhow!("catalog store lock poisoned")))
    }
}

#[async_trait]
impl CatalogReader for SqliteCatalog {
    async fn list_page(&self, page: u32, page_size: u32) -> Result<CatalogPage, CatalogError> {
        self.lock()?.list_page(page, page_size)
    }
}

#[async_trait]
impl CatalogWriter for SqliteCatalog {
    async fn create(&self, entry: &NewCatalogEntry) -> Result<i64, CatalogError> {
        self.lock()?.insert(entry)
    }
}
