//! Duplicate detection against the existing catalog.
//!
//! [`ExistingCatalogIndex`] holds normalized URLs, slugs and names of every
//! entry already in the catalog, and grows as the run admits candidates.
//! It is owned by one run and passed by `&mut` through the loop.

use crate::catalog::CatalogReader;
use once_cell::sync::Lazy;
use regex::Regex;
use shared::{CatalogEntry, CatalogError};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

static NAME_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

/// The key a duplicate matched on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKey {
    Url,
    Slug,
    Name,
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateKey::Url => write!(f, "url"),
            DuplicateKey::Slug => write!(f, "slug"),
            DuplicateKey::Name => write!(f, "name"),
        }
    }
}

/// Lowercase, drop scheme, `www.`, trailing `/` and `.git`
pub fn normalize_url(url: &str) -> String {
    let mut url = url.trim().to_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            url = rest.to_string();
            break;
        }
    }
    if let Some(rest) = url.strip_prefix("www.") {
        url = rest.to_string();
    }
    loop {
        let trimmed = url.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        if trimmed.len() == url.len() {
            break;
        }
        url = trimmed.to_string();
    }
    url
}

pub fn normalize_slug(slug: &str) -> String {
    slug.trim().to_lowercase()
}

/// Lowercase with every run of non-alphanumerics collapsed to one space
pub fn normalize_name(name: &str) -> String {
    NAME_SEPARATORS
        .replace_all(&name.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Keys of the catalog plus everything admitted so far in this run
#[derive(Debug, Clone, Default)]
pub struct ExistingCatalogIndex {
    urls: HashSet<String>,
    slugs: HashSet<String>,
    names: HashSet<String>,
}

impl ExistingCatalogIndex {
    /// Page through the catalog until `page > total_pages`
    ///
    /// Any failed page fails the load: a partial index would let known
    /// entries through as new ones.
    pub async fn load(reader: &dyn CatalogReader, page_size: u32) -> Result<Self, CatalogError> {
        let page_size = page_size.max(1);
        let mut index = Self::default();
        let mut page = 1;

        loop {
            let result = reader.list_page(page, page_size).await?;
            let total_pages = result.pagination.total_pages;

            if result.items.is_empty() && page <= total_pages {
                return Err(CatalogError::Request {
                    status: 0,
                    message: format!("catalog page {} of {} was empty", page, total_pages),
                });
            }

            for entry in &result.items {
                index.insert_entry(entry);
            }
            debug!(page, total_pages, items = result.items.len(), "Loaded catalog page");

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        info!(
            urls = index.urls.len(),
            slugs = index.slugs.len(),
            names = index.names.len(),
            "Loaded existing catalog index"
        );

        Ok(index)
    }

    fn insert_entry(&mut self, entry: &CatalogEntry) {
        self.admit(&entry.source_url, &entry.slug, &entry.name);
    }

    /// Cheap check before enrichment: url and name only, never admits
    pub fn precheck(&self, url: &str, name: &str) -> Option<DuplicateKey> {
        if self.urls.contains(&normalize_url(url)) {
            return Some(DuplicateKey::Url);
        }
        if self.names.contains(&normalize_name(name)) {
            return Some(DuplicateKey::Name);
        }
        None
    }

    /// Full check on url, slug and name
    pub fn check(&self, url: &str, slug: &str, name: &str) -> Option<DuplicateKey> {
        if self.urls.contains(&normalize_url(url)) {
            return Some(DuplicateKey::Url);
        }
        if self.slugs.contains(&normalize_slug(slug)) {
            return Some(DuplicateKey::Slug);
        }
        if self.names.contains(&normalize_name(name)) {
            return Some(DuplicateKey::Name);
        }
        None
    }

    /// Record a candidate's keys so later candidates see it
    pub fn admit(&mut self, url: &str, slug: &str, name: &str) {
        let url = normalize_url(url);
        if !url.is_empty() {
            self.urls.insert(url);
        }
        let slug = normalize_slug(slug);
        if !slug.is_empty() {
            self.slugs.insert(slug);
        }
        let name = normalize_name(name);
        if !name.is_empty() {
            self.names.insert(name);
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.slugs.is_empty() && self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared::{CatalogPage, Pagination};

    struct PagedCatalog {
        entries: Vec<CatalogEntry>,
        fail_on_page: Option<u32>,
    }

    #[async_trait]
    impl CatalogReader for PagedCatalog {
        async fn list_page(&self, page: u32, page_size: u32) -> Result<CatalogPage, CatalogError> {
            if self.fail_on_page == Some(page) {
                return Err(CatalogError::Request {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            let total_items = self.entries.len() as u64;
            let items = self
                .entries
                .iter()
                .skip(((page - 1) * page_size) as usize)
                .take(page_size as usize)
                .cloned()
                .collect();
            Ok(CatalogPage {
                items,
                pagination: Pagination {
                    page,
                    page_size,
                    total_items,
                    total_pages: total_items.div_ceil(page_size as u64) as u32,
                },
            })
        }
    }

    fn entry(id: i64, name: &str) -> CatalogEntry {
        CatalogEntry {
            id,
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            source_url: format!("https://github.com/acme/{}", name.to_lowercase().replace(' ', "-")),
        }
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("https://www.GitHub.com/Acme/Tool.git/"), "github.com/acme/tool");
        assert_eq!(normalize_url("http://github.com/acme/tool/"), "github.com/acme/tool");
        assert_eq!(normalize_url("github.com/acme/tool"), "github.com/acme/tool");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Acme  Tool"), "acme tool");
        assert_eq!(normalize_name("acme-tool"), "acme tool");
        assert_eq!(normalize_name("__Acme.Tool__"), "acme tool");
    }

    #[test]
    fn test_check_and_admit() {
        let mut index = ExistingCatalogIndex::default();
        assert!(index.is_empty());
        assert_eq!(index.check("https://github.com/a/b", "b", "B"), None);

        index.admit("https://github.com/a/b", "b", "B");
        assert_eq!(index.check("https://github.com/A/B/", "x", "x"), Some(DuplicateKey::Url));
        assert_eq!(index.check("https://github.com/c/d", " B ", "x"), Some(DuplicateKey::Slug));
        assert_eq!(index.check("https://github.com/c/d", "d", "b"), Some(DuplicateKey::Name));
    }

    #[test]
    fn test_precheck_ignores_slug_and_never_admits() {
        let mut index = ExistingCatalogIndex::default();
        index.admit("https://github.com/a/b", "acme-tool", "Acme");
        assert_eq!(index.precheck("https://github.com/c/d", "acme-tool"), None);
        assert_eq!(index.precheck("https://github.com/c/d", "ACME"), Some(DuplicateKey::Name));
        assert_eq!(index.precheck("https://github.com/e/f", "new"), None);
        assert_eq!(index.precheck("https://github.com/e/f", "new"), None);
    }

    #[tokio::test]
    async fn test_load_pages_to_exhaustion() {
        let catalog = PagedCatalog {
            entries: (1..=5).map(|i| entry(i, &format!("Tool {i}"))).collect(),
            fail_on_page: None,
        };
        let index = ExistingCatalogIndex::load(&catalog, 2).await.unwrap();
        assert_eq!(index.len(), 5);
        assert_eq!(index.check("https://github.com/acme/tool-5", "", ""), Some(DuplicateKey::Url));
        assert_eq!(index.check("", "tool-3", ""), Some(DuplicateKey::Slug));
    }

    #[tokio::test]
    async fn test_load_empty_catalog() {
        let catalog = PagedCatalog {
            entries: Vec::new(),
            fail_on_page: None,
        };
        let index = ExistingCatalogIndex::load(&catalog, 10).await.unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_load_fails_on_any_page_error() {
        let catalog = PagedCatalog {
            entries: (1..=5).map(|i| entry(i, &format!("Tool {i}"))).collect(),
            fail_on_page: Some(2),
        };
        assert!(ExistingCatalogIndex::load(&catalog, 2).await.is_err());
    }
}
