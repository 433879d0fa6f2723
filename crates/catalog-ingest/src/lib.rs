//! Catalog ingestion library.
//!
//! Discovers MCP server repositories through a repository index, filters and
//! ranks them, derives catalog metadata, renders a secondary-language
//! description and writes new entries to the catalog without duplicates.

pub mod api;
pub mod catalog;
pub mod dedup;
pub mod discovery;
pub mod enrich;
pub mod filter;
pub mod localize;
pub mod persist;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ClientError, GitHubClient, RateLimiter, RepoIndex};
pub use catalog::{CatalogReader, CatalogWriter, HttpCatalog, SqliteCatalog};
pub use dedup::{DuplicateKey, ExistingCatalogIndex};
pub use discovery::{Discovery, DiscoveryError, DiscoveryOutcome};
pub use enrich::Enricher;
pub use filter::{CandidateFilter, FilterDecision};
pub use localize::Localizer;
pub use persist::{PersistOutcome, Persister};
pub use pipeline::IngestPipeline;
