//! Candidate discovery.
//!
//! Issues the configured search queries in order, merges every returned
//! repository into a set keyed by source identity, and converts the records
//! into [`Candidate`]s. A failing query is logged and skipped.

use crate::api::{RateLimiter, RepoIndex, RepoRecord};
use chrono::{DateTime, Utc};
use shared::config::IngestConfig;
use shared::Candidate;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Discovery could not produce anything to process
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no discovery queries configured")]
    NoQueries,

    #[error("all {0} discovery queries failed")]
    AllQueriesFailed(usize),
}

/// Result of one discovery pass
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOutcome {
    /// Unique candidates, ordered by source id
    pub candidates: Vec<Candidate>,
    /// Items returned across all queries, repeats included
    pub total_items: usize,
    pub failed_queries: usize,
}

/// Discovery over the repository index
pub struct Discovery {
    index: Arc<dyn RepoIndex>,
    rate_limiter: RateLimiter,
    queries: Vec<String>,
    page_size: u32,
    pages_per_query: u32,
    cooldown: Duration,
    official_owners: HashSet<String>,
}

impl Discovery {
    /// Create a new discovery stage
    pub fn new(index: Arc<dyn RepoIndex>, rate_limiter: RateLimiter, config: &IngestConfig) -> Self {
        Self {
            index,
            rate_limiter,
            queries: config.queries.clone(),
            page_size: config.page_size.clamp(1, 100),
            pages_per_query: config.pages_per_query.max(1),
            cooldown: Duration::from_secs(config.rate_limit_cooldown_secs),
            official_owners: config
                .official_owners
                .iter()
                .map(|o| o.to_lowercase())
                .collect(),
        }
    }

    /// Run every query and merge the results
    pub async fn discover(&self) -> Result<DiscoveryOutcome, DiscoveryError> {
        if self.queries.is_empty() {
            return Err(DiscoveryError::NoQueries);
        }

        info!(queries = self.queries.len(), "Starting discovery");

        let mut merged: BTreeMap<String, Candidate> = BTreeMap::new();
        let mut outcome = DiscoveryOutcome::default();

        for (idx, query) in self.queries.iter().enumerate() {
            info!(
                progress = format!("{}/{}", idx + 1, self.queries.len()),
                query = %query,
                "Running discovery query"
            );

            let mut query_failed = false;
            for page in 1..=self.pages_per_query {
                match self.index.search(query, page, self.page_size).await {
                    Ok(records) => {
                        let returned = records.len();
                        outcome.total_items += returned;
                        for record in records {
                            let candidate = self.candidate_from_record(record);
                            if merged.contains_key(&candidate.source_id) {
                                debug!(source_id = %candidate.source_id, "Dropping repeated item");
                                continue;
                            }
                            merged.insert(candidate.source_id.clone(), candidate);
                        }
                        if returned < self.page_size as usize {
                            break;
                        }
                    }
                    Err(e) => {
                        error!(query = %query, page, error = %e, "Discovery query failed");
                        if page == 1 {
                            query_failed = true;
                        }
                        if e.is_rate_limited() {
                            self.rate_limiter.cooldown(self.cooldown).await;
                        }
                        break;
                    }
                }
            }

            if query_failed {
                outcome.failed_queries += 1;
            }
        }

        if outcome.failed_queries == self.queries.len() {
            return Err(DiscoveryError::AllQueriesFailed(outcome.failed_queries));
        }

        if outcome.failed_queries > 0 {
            warn!(
                failed = outcome.failed_queries,
                total = self.queries.len(),
                "Some discovery queries failed"
            );
        }

        outcome.candidates = merged.into_values().collect();

        info!(
            total_items = outcome.total_items,
            unique = outcome.candidates.len(),
            failed_queries = outcome.failed_queries,
            "Discovery complete"
        );

        Ok(outcome)
    }

    /// Convert an index record into a candidate
    pub fn candidate_from_record(&self, record: RepoRecord) -> Candidate {
        let is_official = self
            .official_owners
            .contains(&record.owner.login.to_lowercase());
        let last_updated = record
            .pushed_at
            .or(record.updated_at)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let description = record.description.filter(|d| !d.trim().is_empty());

        Candidate {
            source_id: record.id.to_string(),
            source_url: record.html_url,
            full_name: record.full_name,
            name: record.name,
            owner: record.owner.login,
            raw_text: description.clone().unwrap_or_default(),
            short_description: description,
            topics: record.topics.into_iter().map(|t| t.to_lowercase()).collect(),
            popularity_score: record.stargazers_count,
            last_updated,
            is_official,
            is_fork: record.fork,
            is_archived: record.archived,
            homepage: record.homepage.filter(|h| !h.trim().is_empty()),
            license: record.license.and_then(|l| l.identifier()),
            default_branch: record.default_branch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, FakeIndex};

    fn config(queries: &[&str]) -> IngestConfig {
        IngestConfig {
            queries: queries.iter().map(|q| q.to_string()).collect(),
            page_size: 2,
            pages_per_query: 3,
            rate_limit_cooldown_secs: 0,
            official_owners: vec!["ModelContextProtocol".to_string()],
            ..IngestConfig::default()
        }
    }

    fn discovery(index: FakeIndex, queries: &[&str]) -> Discovery {
        Discovery::new(
            Arc::new(index),
            RateLimiter::new(Duration::ZERO),
            &config(queries),
        )
    }

    #[tokio::test]
    async fn test_merges_results_and_drops_repeats() {
        let index = FakeIndex::default()
            .with_search(
                "a",
                vec![
                    record(1, "acme", "one", "first", 5),
                    record(2, "acme", "two", "second", 5),
                ],
            )
            .with_search(
                "b",
                vec![
                    record(2, "acme", "two", "second again", 5),
                    record(3, "acme", "three", "third", 5),
                ],
            );

        let outcome = discovery(index, &["a", "b"]).discover().await.unwrap();

        let ids: Vec<_> = outcome.candidates.iter().map(|c| c.source_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(outcome.total_items, 4);
        // First occurrence wins
        assert_eq!(outcome.candidates[1].raw_text, "second");
    }

    #[tokio::test]
    async fn test_pages_until_short_page() {
        let records = (1..=5).map(|i| record(i, "acme", &format!("r{i}"), "x", 5)).collect();
        let index = Arc::new(FakeIndex::default().with_search("a", records));
        let discovery = Discovery::new(
            index.clone(),
            RateLimiter::new(Duration::ZERO),
            &config(&["a"]),
        );

        let outcome = discovery.discover().await.unwrap();
        assert_eq!(outcome.candidates.len(), 5);

        let calls = index.search_calls.lock().unwrap().clone();
        assert_eq!(calls, vec![("a".to_string(), 1), ("a".to_string(), 2), ("a".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_failed_query_is_skipped() {
        let mut index = FakeIndex::default().with_search("good", vec![record(1, "acme", "one", "x", 5)]);
        index.searches.insert("bad".to_string(), Err(502));

        let outcome = discovery(index, &["bad", "good"]).discover().await.unwrap();
        assert_eq!(outcome.failed_queries, 1);
        assert_eq!(outcome.candidates.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_query_is_skipped_after_cooldown() {
        let mut index = FakeIndex::default().with_search("good", vec![record(1, "acme", "one", "x", 5)]);
        index.rate_limited_queries.insert("limited".to_string());
        let config = IngestConfig {
            rate_limit_cooldown_secs: 60,
            ..config(&["limited", "good"])
        };
        let discovery = Discovery::new(Arc::new(index), RateLimiter::new(Duration::ZERO), &config);

        let start = tokio::time::Instant::now();
        let outcome = discovery.discover().await.unwrap();
        assert_eq!(outcome.failed_queries, 1);
        assert_eq!(outcome.candidates.len(), 1);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_all_queries_failing_is_an_error() {
        let mut index = FakeIndex::default();
        index.searches.insert("a".to_string(), Err(500));
        index.searches.insert("b".to_string(), Err(503));

        let err = discovery(index, &["a", "b"]).discover().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::AllQueriesFailed(2)));
    }

    #[tokio::test]
    async fn test_no_queries_is_an_error() {
        let err = discovery(FakeIndex::default(), &[]).discover().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NoQueries));
    }

    #[test]
    fn test_candidate_conversion() {
        let discovery = discovery(FakeIndex::default(), &["a"]);
        let mut rec = record(7, "modelcontextprotocol", "servers", "  ", 900);
        rec.topics = vec!["MCP".to_string()];
        rec.pushed_at = None;
        rec.fork = true;

        let candidate = discovery.candidate_from_record(rec);
        assert_eq!(candidate.source_id, "7");
        assert!(candidate.is_official);
        assert!(candidate.is_fork);
        assert!(!candidate.is_archived);
        assert!(candidate.short_description.is_none());
        assert!(candidate.raw_text.is_empty());
        assert!(candidate.topics.contains("mcp"));
        assert_eq!(candidate.last_updated, DateTime::<Utc>::UNIX_EPOCH);
    }
}
