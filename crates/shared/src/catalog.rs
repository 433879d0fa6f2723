//! Local catalog storage.
//!
//! Provides the paginated listing and the create-with-uniqueness operation
//! that the ingestion pipeline consumes through its catalog interfaces.

use crate::error::CatalogError;
use crate::models::{CatalogEntry, CatalogPage, NewCatalogEntry, Pagination};
use crate::Database;
use rusqlite::params;
use tracing::{debug, info};

/// Catalog store backed by SQLite
pub struct CatalogStore {
    db: Database,
}

impl CatalogStore {
    /// Create a new catalog store with the given database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// List one page of existing entries (pages are 1-based)
    pub fn list_page(&self, page: u32, page_size: u32) -> Result<CatalogPage, CatalogError> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let total_items = self.count()?;
        let conn = self.db.conn();

        let total_pages = total_items.div_ceil(page_size as u64) as u32;

        let mut stmt = conn.prepare(
            "SELECT id, name, slug, source_url FROM catalog_entries
             ORDER BY id ASC LIMIT ?1 OFFSET ?2",
        )?;
        let offset = (page as i64 - 1) * page_size as i64;
        let items = stmt
            .query_map(params![page_size as i64, offset], |row| {
                Ok(CatalogEntry {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    slug: row.get(2)?,
                    source_url: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(page, page_size, items = items.len(), total_pages, "Listed catalog page");

        Ok(CatalogPage {
            items,
            pagination: Pagination {
                page,
                page_size,
                total_items,
                total_pages,
            },
        })
    }

    /// Insert a new entry
    ///
    /// A UNIQUE constraint violation on slug or source URL is reported as
    /// [`CatalogError::DuplicateConflict`], never as a storage failure.
    pub fn insert(&mut self, entry: &NewCatalogEntry) -> Result<i64, CatalogError> {
        let conn = self.db.conn_mut();

        let result = conn.execute(
            "INSERT INTO catalog_entries (
                source_id, name, name_alt, slug, description, description_alt,
                source_url, docs_url, demo_url, install_command,
                license, creator, version, image_url,
                tags, categories, is_official, popularity_score
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18
            )",
            params![
                entry.source_id,
                entry.name,
                entry.name_alt,
                entry.slug,
                entry.description,
                entry.description_alt,
                entry.source_url,
                entry.docs_url,
                entry.demo_url,
                entry.install_command,
                entry.license,
                entry.creator,
                entry.version,
                entry.image_url,
                serde_json::to_string(&entry.tags).map_err(anyhow::Error::from)?,
                serde_json::to_string(&entry.categories).map_err(anyhow::Error::from)?,
                entry.is_official,
                entry.popularity_score,
            ],
        );

        match result {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                info!(id, slug = %entry.slug, name = %entry.name, "Created catalog entry");
                Ok(id)
            }
            Err(rusqlite::Error::SqliteFailure(err, message))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let field = conflicting_field(message.as_deref());
                debug!(slug = %entry.slug, field = %field, "Catalog entry already exists");
                Err(CatalogError::DuplicateConflict { field })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of entries in the catalog
    pub fn count(&self) -> Result<u64, CatalogError> {
        let count: i64 =
            self.db
                .conn()
                .query_row("SELECT COUNT(*) FROM catalog_entries", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// Column named in a SQLite "UNIQUE constraint failed: table.column" message
fn conflicting_field(message: Option<&str>) -> String {
    message
        .and_then(|m| m.rsplit('.').next())
        .map(|column| column.trim().to_string())
        .filter(|column| !column.is_empty())
        .unwrap_or_else(|| "unique key".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn entry(slug: &str, url: &str) -> NewCatalogEntry {
        NewCatalogEntry {
            source_id: slug.to_string(),
            name: slug.to_string(),
            name_alt: slug.to_string(),
            slug: slug.to_string(),
            description: "An MCP server".to_string(),
            description_alt: "MCP 服务器".to_string(),
            source_url: url.to_string(),
            docs_url: String::new(),
            demo_url: String::new(),
            install_command: String::new(),
            license: "MIT".to_string(),
            creator: "acme".to_string(),
            version: "latest".to_string(),
            image_url: String::new(),
            tags: vec!["mcp".to_string()],
            categories: vec!["MCP Servers".to_string()],
            is_official: false,
            popularity_score: 10,
        }
    }

    fn store() -> Result<CatalogStore> {
        Ok(CatalogStore::new(Database::open_in_memory()?))
    }

    #[test]
    fn test_insert_and_list() -> Result<()> {
        let mut store = store()?;
        let id = store.insert(&entry("acme-tool", "https://github.com/acme/tool"))?;

        let page = store.list_page(1, 10)?;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, id);
        assert_eq!(page.items[0].slug, "acme-tool");
        assert_eq!(page.items[0].source_url, "https://github.com/acme/tool");
        assert_eq!(store.count()?, 1);

        Ok(())
    }

    #[test]
    fn test_duplicate_slug_is_conflict() -> Result<()> {
        let mut store = store()?;
        store.insert(&entry("acme-tool", "https://github.com/acme/tool"))?;

        let err = store
            .insert(&entry("acme-tool", "https://github.com/other/tool"))
            .unwrap_err();
        match err {
            CatalogError::DuplicateConflict { field } => assert_eq!(field, "slug"),
            other => panic!("unexpected error: {other}"),
        }

        Ok(())
    }

    #[test]
    fn test_duplicate_source_url_is_conflict() -> Result<()> {
        let mut store = store()?;
        store.insert(&entry("acme-tool", "https://github.com/acme/tool"))?;

        let err = store
            .insert(&entry("acme-tool-2", "https://github.com/acme/tool"))
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.count()?, 1);

        Ok(())
    }

    #[test]
    fn test_pagination() -> Result<()> {
        let mut store = store()?;
        for i in 0..5 {
            store.insert(&entry(&format!("tool-{i}"), &format!("https://github.com/acme/{i}")))?;
        }

        let first = store.list_page(1, 2)?;
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.pagination.total_items, 5);
        assert_eq!(first.pagination.total_pages, 3);

        let last = store.list_page(3, 2)?;
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].slug, "tool-4");

        let beyond = store.list_page(4, 2)?;
        assert!(beyond.items.is_empty());

        Ok(())
    }

    #[test]
    fn test_empty_catalog_has_zero_pages() -> Result<()> {
        let store = store()?;
        let page = store.list_page(1, 50)?;
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total_pages, 0);
        Ok(())
    }

    #[test]
    fn test_conflicting_field_parsing() {
        assert_eq!(
            conflicting_field(Some("UNIQUE constraint failed: catalog_entries.source_url")),
            "source_url"
        );
        assert_eq!(conflicting_field(None), "unique key");
    }
}
