//! Data models for the ingestion pipeline.
//!
//! Candidates flow through discovery, filtering, enrichment and localization
//! before being assembled into a [`NewCatalogEntry`] for the catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A discovered entry that has not been persisted yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    /// Stable identity in the repository index
    pub source_id: String,
    pub source_url: String,
    /// `owner/name` path used to address the repository
    pub full_name: String,
    pub name: String,
    pub owner: String,

    /// Short description reported by the index
    pub short_description: Option<String>,
    /// Description or readme text used by the extraction heuristics
    pub raw_text: String,
    pub topics: BTreeSet<String>,

    pub popularity_score: i64,
    pub last_updated: DateTime<Utc>,
    pub is_official: bool,
    /// Forked from another repository
    pub is_fork: bool,
    /// Read-only in the index, no longer maintained
    pub is_archived: bool,

    pub homepage: Option<String>,
    /// License identifier reported by the index
    pub license: Option<String>,
    pub default_branch: Option<String>,
}

impl Candidate {
    /// Lowercased name, description and topics, used for keyword matching
    pub fn combined_text(&self) -> String {
        let mut text = format!("{} {}", self.name, self.raw_text);
        if let Some(description) = &self.short_description {
            if !self.raw_text.contains(description.as_str()) {
                text.push(' ');
                text.push_str(description);
            }
        }
        for topic in &self.topics {
            text.push(' ');
            text.push_str(topic);
        }
        text.to_lowercase()
    }
}

/// Metadata derived for a candidate by the enricher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EnrichedFields {
    pub description: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub install_command: String,
    pub docs_url: String,
    pub demo_url: String,
    pub license: String,
    pub creator: String,
    pub version: String,
    pub image_url: String,
    pub slug: String,
}

/// Secondary-language rendering of the text fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LocalizedFields {
    pub name_alt: String,
    pub description_alt: String,
}

/// Entry handed to the catalog write interface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NewCatalogEntry {
    pub source_id: String,
    pub name: String,
    pub name_alt: String,
    pub slug: String,
    pub description: String,
    pub description_alt: String,
    pub source_url: String,
    pub docs_url: String,
    pub demo_url: String,
    pub install_command: String,
    pub license: String,
    pub creator: String,
    pub version: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub is_official: bool,
    pub popularity_score: i64,
}

impl NewCatalogEntry {
    /// Assemble the entry from a fully processed candidate
    pub fn assemble(
        candidate: &Candidate,
        enriched: EnrichedFields,
        localized: LocalizedFields,
    ) -> Self {
        Self {
            source_id: candidate.source_id.clone(),
            name: candidate.name.clone(),
            name_alt: localized.name_alt,
            slug: enriched.slug,
            description: enriched.description,
            description_alt: localized.description_alt,
            source_url: candidate.source_url.clone(),
            docs_url: enriched.docs_url,
            demo_url: enriched.demo_url,
            install_command: enriched.install_command,
            license: enriched.license,
            creator: enriched.creator,
            version: enriched.version,
            image_url: enriched.image_url,
            tags: enriched.tags,
            categories: enriched.categories,
            is_official: candidate.is_official,
            popularity_score: candidate.popularity_score,
        }
    }
}

/// An entry already present in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub source_url: String,
}

/// Pagination metadata returned by the catalog read interface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

/// One page of the existing catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogPage {
    pub items: Vec<CatalogEntry>,
    pub pagination: Pagination,
}

/// How a run ended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Aborted { reason: String },
}

/// Per-run summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestionResult {
    pub discovered: usize,
    pub filtered_out: usize,
    pub duplicate: usize,
    pub enrich_failed: usize,
    pub persisted: usize,
    pub persist_failed: usize,
    pub failed_queries: usize,
    pub dry_run: bool,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl IngestionResult {
    /// Start a new summary
    pub fn start(dry_run: bool) -> Self {
        Self {
            discovered: 0,
            filtered_out: 0,
            duplicate: 0,
            enrich_failed: 0,
            persisted: 0,
            persist_failed: 0,
            failed_queries: 0,
            dry_run,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Mark the run as completed
    pub fn complete(mut self) -> Self {
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
        self
    }

    /// Mark the run as aborted
    pub fn abort(mut self, reason: impl Into<String>) -> Self {
        self.status = RunStatus::Aborted {
            reason: reason.into(),
        };
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted { .. })
    }
}
