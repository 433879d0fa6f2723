//! Per-candidate enrichment.
//!
//! Fetches extended metadata through the repository index and derives the
//! catalog fields from it with the rule tables in [`rules`]. The detail fetch
//! is required; readme and manifest are best-effort.

pub mod image;
pub mod rules;

use crate::api::{ClientError, Manifest, RateLimiter, RepoDetail, RepoIndex};
use anyhow::{Context, Result};
use image::ImageResolver;
use rules::{DescriptionInput, KeywordTable, RuleSet, DESCRIPTION_SOURCES};
use shared::config::{EnrichConfig, IngestConfig};
use shared::{Candidate, EnrichedFields};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_TAGS: usize = 10;
const MAX_CATEGORIES: usize = 3;

/// Derives [`EnrichedFields`] for candidates
pub struct Enricher {
    index: Arc<dyn RepoIndex>,
    rate_limiter: RateLimiter,
    cooldown: Duration,
    rules: RuleSet,
    tags: KeywordTable,
    categories: KeywordTable,
    images: ImageResolver,
    kind: String,
    baseline_tags: Vec<String>,
    baseline_category: String,
    max_description_chars: usize,
}

impl Enricher {
    pub fn new(
        index: Arc<dyn RepoIndex>,
        rate_limiter: RateLimiter,
        ingest: &IngestConfig,
        config: &EnrichConfig,
        raw_base_url: &str,
    ) -> Result<Self> {
        let tags = KeywordTable::new(&config.tag_rules).context("Invalid tag keyword")?;
        let categories =
            KeywordTable::new(&config.category_rules).context("Invalid category keyword")?;

        Ok(Self {
            index,
            rate_limiter,
            cooldown: Duration::from_secs(ingest.rate_limit_cooldown_secs),
            rules: RuleSet::default(),
            tags,
            categories,
            images: ImageResolver::new(
                raw_base_url,
                config.image_suffixes.clone(),
                ingest.fallback_image_url.clone(),
                ingest.probe_budget,
            ),
            kind: ingest.kind.clone(),
            baseline_tags: config.baseline_tags.clone(),
            baseline_category: config.baseline_category.clone(),
            max_description_chars: config.max_description_chars.max(4),
        })
    }

    /// Image probes left in this run's budget
    pub fn probes_remaining(&self) -> usize {
        self.images.probes_remaining()
    }

    /// Fetch extended metadata and derive every field
    ///
    /// The candidate is updated in place with the detail record and readme.
    /// Only a failed detail fetch, or a rate-limited readme or manifest
    /// fetch, is an error. A rate-limited image probe falls back to the
    /// default image and cools down before returning.
    pub async fn enrich(&mut self, candidate: &mut Candidate) -> Result<EnrichedFields, ClientError> {
        let detail = self.index.get_detail(&candidate.full_name).await?;
        apply_detail(candidate, detail);

        match self.index.get_readme(&candidate.full_name).await {
            Ok(Some(readme)) => candidate.raw_text = readme,
            Ok(None) => debug!(name = %candidate.name, "No readme"),
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => warn!(name = %candidate.name, error = %e, "Readme fetch failed"),
        }

        let manifest = match self.index.get_manifest(&candidate.full_name).await {
            Ok(manifest) => manifest,
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => {
                warn!(name = %candidate.name, error = %e, "Manifest fetch failed");
                None
            }
        };

        let image = self
            .images
            .resolve(
                self.index.as_ref(),
                &self.rules.images,
                candidate,
                &candidate.raw_text,
            )
            .await;
        if image.rate_limited {
            self.rate_limiter.cooldown(self.cooldown).await;
        }

        Ok(self.derive(candidate, manifest.as_ref(), image.url))
    }

    /// Derive the fields that need no network access
    pub fn derive(
        &self,
        candidate: &Candidate,
        manifest: Option<&Manifest>,
        image_url: String,
    ) -> EnrichedFields {
        let text = candidate.combined_text();

        EnrichedFields {
            description: self.description(candidate),
            tags: self.tags(candidate, &text),
            categories: self.categories(&text),
            install_command: self.install_command(candidate, manifest),
            docs_url: rules::first_match(&self.rules.docs, &candidate.raw_text)
                .map(|(_, url)| url)
                .unwrap_or_else(|| format!("{}#readme", candidate.source_url)),
            demo_url: rules::first_match(&self.rules.demo, &candidate.raw_text)
                .map(|(_, url)| url)
                .unwrap_or_default(),
            license: manifest
                .and_then(|m| m.license.as_ref())
                .map(|l| l.as_str().trim().to_string())
                .filter(|l| !l.is_empty())
                .or_else(|| candidate.license.clone())
                .unwrap_or_default(),
            creator: candidate.owner.clone(),
            version: manifest
                .and_then(|m| m.version.as_deref())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or("latest")
                .to_string(),
            image_url,
            slug: slug_for(candidate),
        }
    }

    fn description(&self, candidate: &Candidate) -> String {
        let input = DescriptionInput {
            short_description: candidate.short_description.as_deref(),
            text: &candidate.raw_text,
        };
        let description = DESCRIPTION_SOURCES
            .iter()
            .find_map(|(name, source)| {
                source(&input).map(|value| {
                    debug!(name = %candidate.name, source = name, "Description found");
                    value
                })
            })
            .unwrap_or_else(|| format!("{} for {}", self.kind, candidate.name));
        rules::truncate_chars(&description, self.max_description_chars)
    }

    fn install_command(&self, candidate: &Candidate, manifest: Option<&Manifest>) -> String {
        if let Some((rule, command)) = rules::first_match(&self.rules.install, &candidate.raw_text) {
            debug!(name = %candidate.name, rule, "Install command found");
            return command;
        }
        manifest
            .filter(|m| !m.private)
            .and_then(|m| m.name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|package| format!("npx -y {}", package))
            .unwrap_or_default()
    }

    fn tags(&self, candidate: &Candidate, text: &str) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        let derived = self
            .baseline_tags
            .iter()
            .cloned()
            .chain(self.tags.matches(text))
            .chain(candidate.topics.iter().cloned());
        for tag in derived {
            if tags.len() == MAX_TAGS {
                break;
            }
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }

    fn categories(&self, text: &str) -> Vec<String> {
        let mut categories = vec![self.baseline_category.clone()];
        for category in self.categories.matches(text) {
            if categories.len() == MAX_CATEGORIES {
                break;
            }
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        categories
    }
}

/// Overlay the detail record on the search-time candidate
fn apply_detail(candidate: &mut Candidate, detail: RepoDetail) {
    if let Some(description) = detail.description.filter(|d| !d.trim().is_empty()) {
        if candidate.raw_text.is_empty() {
            candidate.raw_text = description.clone();
        }
        candidate.short_description = Some(description);
    }
    if !detail.topics.is_empty() {
        candidate.topics = detail.topics.into_iter().map(|t| t.to_lowercase()).collect();
    }
    if let Some(homepage) = detail.homepage.filter(|h| !h.trim().is_empty()) {
        candidate.homepage = Some(homepage);
    }
    if let Some(license) = detail.license.and_then(|l| l.identifier()) {
        candidate.license = Some(license);
    }
    if detail.default_branch.is_some() {
        candidate.default_branch = detail.default_branch;
    }
    candidate.popularity_score = detail.stargazers_count;
}

/// Slug for a candidate, never empty
pub fn slug_for(candidate: &Candidate) -> String {
    let slug = rules::slugify(&candidate.name);
    if slug.is_empty() {
        format!("entry-{}", candidate.source_id)
    } else {
        slug
    }
}
