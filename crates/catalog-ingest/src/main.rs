//! Catalog ingestion CLI application.

use anyhow::{bail, Context, Result};
use catalog_ingest::{
    CatalogReader, CatalogWriter, GitHubClient, HttpCatalog, IngestPipeline, RateLimiter,
    SqliteCatalog,
};
use clap::Parser;
use shared::config::CatalogBackend;
use shared::{CatalogStore, Config, Database, RunStatus};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Run every stage but skip catalog writes
    #[arg(long)]
    dry_run: bool,

    /// Override the maximum number of candidates processed
    #[arg(long)]
    max_candidates: Option<usize>,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(max) = args.max_candidates {
        config.ingest.max_candidates = max;
    }

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        shared::logging::parse_level(&config.logging.default_level)
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "catalog-ingest".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!("Catalog ingestion starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    let rate_limiter = RateLimiter::new(Duration::from_millis(config.ingest.min_interval_ms));
    let timeout = Duration::from_secs(config.index.timeout_secs);

    // Initialize repository index client
    let token = config.index_token();
    info!(
        base_url = %config.index.base_url,
        authenticated = token.is_some(),
        min_interval_ms = config.ingest.min_interval_ms,
        "Creating repository index client"
    );
    let index = GitHubClient::new(
        config.index.base_url.clone(),
        &config.index.user_agent,
        timeout,
        token,
        rate_limiter.clone(),
    )
    .context("Failed to create repository index client")?;

    // Initialize catalog backend
    let (reader, writer): (Arc<dyn CatalogReader>, Arc<dyn CatalogWriter>) =
        match config.catalog.backend {
            CatalogBackend::Sqlite => {
                let db_path = config.database_path();
                info!(db_path = %db_path.display(), "Opening catalog database");
                let database = Database::open(&db_path).context("Failed to open database")?;
                let catalog = Arc::new(SqliteCatalog::new(CatalogStore::new(database)));
                let reader: Arc<dyn CatalogReader> = catalog.clone();
                let writer: Arc<dyn CatalogWriter> = catalog;
                (reader, writer)
            }
            CatalogBackend::Http => {
                info!(base_url = %config.catalog.base_url, "Using remote catalog");
                let catalog = Arc::new(
                    HttpCatalog::new(
                        &config.catalog.base_url,
                        timeout,
                        config.catalog.token.clone(),
                        rate_limiter.clone(),
                    )
                    .context("Failed to create catalog client")?,
                );
                let reader: Arc<dyn CatalogReader> = catalog.clone();
                let writer: Arc<dyn CatalogWriter> = catalog;
                (reader, writer)
            }
        };

    let mut pipeline = IngestPipeline::new(&config, Arc::new(index), rate_limiter, reader, writer)
        .context("Failed to build ingestion pipeline")?
        .with_dry_run(args.dry_run);

    // Run pipeline
    let result = pipeline.run().await;

    // Display final statistics
    info!("=== Ingestion Complete ===");
    info!("Discovered: {}", result.discovered);
    info!("Filtered out: {}", result.filtered_out);
    info!("Duplicates: {}", result.duplicate);
    info!("Enrichment failures: {}", result.enrich_failed);
    if result.dry_run {
        info!("Would persist (dry run): {}", result.persisted);
    } else {
        info!("Persisted: {}", result.persisted);
    }
    info!("Persist failures: {}", result.persist_failed);
    info!("Failed queries: {}", result.failed_queries);

    if let Some(path) = &args.summary {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialize summary")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        info!(path = %path.display(), "Wrote run summary");
    }

    if let RunStatus::Aborted { reason } = &result.status {
        error!(reason = %reason, "Ingestion run aborted");
        bail!("Ingestion run aborted: {}", reason);
    }

    info!("Catalog ingestion finished successfully");

    Ok(())
}
