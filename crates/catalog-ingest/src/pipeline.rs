//! Ingestion pipeline orchestrator.
//!
//! Runs one strictly sequential pass: load the existing catalog, discover,
//! filter, then enrich, localize, dedup and persist each candidate in rank
//! order. Failures are contained per query and per candidate; the run only
//! aborts when the catalog cannot be read or discovery yields nothing.

use crate::api::{RateLimiter, RepoIndex};
use crate::catalog::{CatalogReader, CatalogWriter};
use crate::dedup::ExistingCatalogIndex;
use crate::discovery::{Discovery, DiscoveryError};
use crate::enrich::Enricher;
use crate::filter::CandidateFilter;
use crate::localize::Localizer;
use crate::persist::{PersistOutcome, Persister};
use anyhow::{Context, Result};
use shared::{Candidate, Config, IngestionResult, NewCatalogEntry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Main ingestion coordinator
pub struct IngestPipeline {
    discovery: Discovery,
    filter: CandidateFilter,
    enricher: Enricher,
    localizer: Localizer,
    persister: Persister,
    reader: Arc<dyn CatalogReader>,
    rate_limiter: RateLimiter,
    cooldown: Duration,
    catalog_page_size: u32,
}

impl IngestPipeline {
    /// Build every stage from configuration
    pub fn new(
        config: &Config,
        index: Arc<dyn RepoIndex>,
        rate_limiter: RateLimiter,
        reader: Arc<dyn CatalogReader>,
        writer: Arc<dyn CatalogWriter>,
    ) -> Result<Self> {
        let ingest = &config.ingest;

        let enricher = Enricher::new(
            index.clone(),
            rate_limiter.clone(),
            ingest,
            &config.enrich,
            &config.index.raw_base_url,
        )
        .context("Failed to build enricher")?;
        let localizer = Localizer::new(&config.localize, ingest.localization_enabled)
            .context("Failed to build localizer")?;

        Ok(Self {
            discovery: Discovery::new(index, rate_limiter.clone(), ingest),
            filter: CandidateFilter::new(
                &config.filter,
                ingest.min_popularity,
                ingest.max_candidates,
            )
            .context("Invalid filter keyword")?,
            enricher,
            localizer,
            persister: Persister::new(writer, false),
            reader,
            rate_limiter,
            cooldown: Duration::from_secs(ingest.rate_limit_cooldown_secs),
            catalog_page_size: config.catalog.page_size,
        })
    }

    /// Skip catalog writes, counting entries as if they were created
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.persister = self.persister.with_dry_run(dry_run);
        self
    }

    /// Run the complete ingestion pass
    ///
    /// This is the main entry point that orchestrates:
    /// 1. Existing catalog load
    /// 2. Discovery
    /// 3. Filtering and ranking
    /// 4. Per-candidate enrichment, localization, dedup and persistence
    pub async fn run(&mut self) -> IngestionResult {
        let mut result = IngestionResult::start(self.persister.is_dry_run());
        info!(
            dry_run = result.dry_run,
            localization = self.localizer.is_enabled(),
            "Starting ingestion run"
        );

        // Phase 1: Existing catalog
        info!("Phase 1: Loading existing catalog");
        let mut catalog =
            match ExistingCatalogIndex::load(self.reader.as_ref(), self.catalog_page_size).await {
                Ok(catalog) => {
                    if catalog.is_empty() {
                        info!("Existing catalog is empty");
                    } else {
                        info!(entries = catalog.len(), "Existing catalog loaded");
                    }
                    catalog
                }
                Err(e) => {
                    error!(error = %e, "Failed to load existing catalog");
                    return result.abort(format!("catalog read failed: {}", e));
                }
            };

        // Phase 2: Discovery
        info!("Phase 2: Discovering candidates");
        let discovered = match self.discovery.discover().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Discovery failed");
                result.failed_queries = match e {
                    DiscoveryError::AllQueriesFailed(n) => n,
                    DiscoveryError::NoQueries => 0,
                };
                return result.abort(e.to_string());
            }
        };
        result.discovered = discovered.candidates.len();
        result.failed_queries = discovered.failed_queries;

        // Phase 3: Filtering
        info!("Phase 3: Filtering candidates");
        let filtered = self.filter.apply(discovered.candidates);
        result.filtered_out = filtered.filtered_out();

        // Phase 4: Per-candidate processing
        info!(candidates = filtered.accepted.len(), "Phase 4: Processing candidates");
        let total = filtered.accepted.len();
        for (idx, mut candidate) in filtered.accepted.into_iter().enumerate() {
            info!(
                progress = format!("{}/{}", idx + 1, total),
                name = %candidate.full_name,
                "Processing candidate"
            );
            self.process(&mut candidate, &mut catalog, &mut result).await;
        }

        let result = result.complete();
        info!(
            discovered = result.discovered,
            filtered_out = result.filtered_out,
            duplicate = result.duplicate,
            enrich_failed = result.enrich_failed,
            persisted = result.persisted,
            persist_failed = result.persist_failed,
            failed_queries = result.failed_queries,
            probes_remaining = self.enricher.probes_remaining(),
            "Ingestion run complete"
        );
        result
    }

    async fn process(
        &mut self,
        candidate: &mut Candidate,
        catalog: &mut ExistingCatalogIndex,
        result: &mut IngestionResult,
    ) {
        if let Some(key) = catalog.precheck(&candidate.source_url, &candidate.name) {
            debug!(name = %candidate.name, key = %key, "Known duplicate, skipping enrichment");
            result.duplicate += 1;
            return;
        }

        let enriched = match self.enricher.enrich(candidate).await {
            Ok(fields) => fields,
            Err(e) => {
                error!(name = %candidate.full_name, error = %e, "Failed to enrich candidate");
                if e.is_rate_limited() {
                    self.rate_limiter.cooldown(self.cooldown).await;
                }
                result.enrich_failed += 1;
                return;
            }
        };

        let localized = self.localizer.localize(&candidate.name, &enriched.description);
        let entry = NewCatalogEntry::assemble(candidate, enriched, localized);

        if entry.description.trim().is_empty() || entry.description_alt.trim().is_empty() {
            warn!(name = %entry.name, "Entry has no description, skipping");
            result.enrich_failed += 1;
            return;
        }

        if let Some(key) = catalog.check(&entry.source_url, &entry.slug, &entry.name) {
            info!(name = %entry.name, slug = %entry.slug, key = %key, "Duplicate candidate");
            result.duplicate += 1;
            return;
        }
        catalog.admit(&entry.source_url, &entry.slug, &entry.name);

        match self.persister.persist(&entry).await {
            PersistOutcome::Created(_) | PersistOutcome::DryRun => result.persisted += 1,
            PersistOutcome::Duplicate(_) => result.duplicate += 1,
            PersistOutcome::Failed(_) => result.persist_failed += 1,
        }
    }
}
