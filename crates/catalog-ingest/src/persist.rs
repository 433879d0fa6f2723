//! Catalog writes.

use crate::catalog::CatalogWriter;
use shared::{CatalogError, NewCatalogEntry};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of persisting one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Created(i64),
    /// Rejected by the catalog's own uniqueness check
    Duplicate(String),
    Failed(String),
    /// Dry run: the write was skipped
    DryRun,
}

/// Hands finished entries to the catalog write interface
pub struct Persister {
    writer: Arc<dyn CatalogWriter>,
    dry_run: bool,
}

impl Persister {
    pub fn new(writer: Arc<dyn CatalogWriter>, dry_run: bool) -> Self {
        Self { writer, dry_run }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub async fn persist(&self, entry: &NewCatalogEntry) -> PersistOutcome {
        if self.dry_run {
            info!(slug = %entry.slug, name = %entry.name, "Dry run, skipping catalog write");
            return PersistOutcome::DryRun;
        }

        match self.writer.create(entry).await {
            Ok(id) => PersistOutcome::Created(id),
            Err(CatalogError::DuplicateConflict { field }) => {
                warn!(slug = %entry.slug, field = %field, "Catalog rejected duplicate entry");
                PersistOutcome::Duplicate(field)
            }
            Err(e) => {
                error!(slug = %entry.slug, error = %e, "Failed to persist entry");
                PersistOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingWriter {
        created: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CatalogWriter for RecordingWriter {
        async fn create(&self, entry: &NewCatalogEntry) -> Result<i64, CatalogError> {
            match entry.slug.as_str() {
                "taken" => Err(CatalogError::DuplicateConflict {
                    field: "slug".to_string(),
                }),
                "broken" => Err(CatalogError::Request {
                    status: 500,
                    message: "boom".to_string(),
                }),
                _ => {
                    let mut created = self.created.lock().unwrap();
                    created.push(entry.slug.clone());
                    Ok(created.len() as i64)
                }
            }
        }
    }

    fn entry(slug: &str) -> NewCatalogEntry {
        NewCatalogEntry {
            slug: slug.to_string(),
            ..NewCatalogEntry::default()
        }
    }

    #[tokio::test]
    async fn test_outcomes() {
        let writer = Arc::new(RecordingWriter::default());
        let persister = Persister::new(writer.clone(), false);

        assert_eq!(persister.persist(&entry("acme")).await, PersistOutcome::Created(1));
        assert_eq!(
            persister.persist(&entry("taken")).await,
            PersistOutcome::Duplicate("slug".to_string())
        );
        assert!(matches!(
            persister.persist(&entry("broken")).await,
            PersistOutcome::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_dry_run_skips_writer() {
        let writer = Arc::new(RecordingWriter::default());
        let persister = Persister::new(writer.clone(), true);

        assert_eq!(persister.persist(&entry("acme")).await, PersistOutcome::DryRun);
        assert!(writer.created.lock().unwrap().is_empty());
    }
}
