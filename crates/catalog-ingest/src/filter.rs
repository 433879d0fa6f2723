//! Candidate scoring and filtering.
//!
//! Admission is keyword based: official candidates and candidates carrying a
//! strong-positive marker skip the positive-keyword requirement, but a
//! negative keyword vetoes every candidate, as does being archived or a fork.
//! Survivors are ranked with a total order and truncated to the configured
//! maximum.

use crate::enrich::rules::KeywordTable;
use shared::config::{FilterConfig, KeywordRule};
use shared::Candidate;
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, info};

/// Why a candidate was admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptReason {
    Official,
    StrongPositive(String),
    Positive(String),
}

/// Why a candidate was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    LowPopularity { score: i64, min: i64 },
    Archived,
    Fork,
    NegativeKeyword(String),
    NoPositiveKeyword,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::LowPopularity { score, min } => {
                write!(f, "popularity {} below minimum {}", score, min)
            }
            RejectReason::Archived => write!(f, "archived repository"),
            RejectReason::Fork => write!(f, "fork of another repository"),
            RejectReason::NegativeKeyword(keyword) => write!(f, "negative keyword '{}'", keyword),
            RejectReason::NoPositiveKeyword => write!(f, "no positive keyword"),
        }
    }
}

/// Outcome of evaluating one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Accepted(AcceptReason),
    Rejected(RejectReason),
}

impl FilterDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterDecision::Accepted(_))
    }
}

/// Filtered and ranked candidates
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub accepted: Vec<Candidate>,
    pub rejected: usize,
    /// Admitted but dropped by the `max_candidates` cut
    pub truncated: usize,
}

impl FilterOutcome {
    pub fn filtered_out(&self) -> usize {
        self.rejected + self.truncated
    }
}

/// Keyword filter with a popularity floor
///
/// Keywords match whole words, ignoring case.
pub struct CandidateFilter {
    min_popularity: i64,
    max_candidates: usize,
    strong_positive: KeywordTable,
    positive: KeywordTable,
    negative: KeywordTable,
}

/// Each keyword maps to its own lowercased form, reported as the reason
fn keyword_table(words: &[String]) -> Result<KeywordTable, regex::Error> {
    let rules: Vec<KeywordRule> = words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .map(|w| KeywordRule::new(&w, &w))
        .collect();
    KeywordTable::new(&rules)
}

impl CandidateFilter {
    pub fn new(
        config: &FilterConfig,
        min_popularity: i64,
        max_candidates: usize,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            min_popularity,
            max_candidates,
            strong_positive: keyword_table(&config.strong_positive)?,
            positive: keyword_table(&config.positive)?,
            negative: keyword_table(&config.negative)?,
        })
    }

    /// Decide whether a single candidate is admitted
    pub fn evaluate(&self, candidate: &Candidate) -> FilterDecision {
        if candidate.popularity_score < self.min_popularity {
            return FilterDecision::Rejected(RejectReason::LowPopularity {
                score: candidate.popularity_score,
                min: self.min_popularity,
            });
        }

        if candidate.is_archived {
            return FilterDecision::Rejected(RejectReason::Archived);
        }
        if candidate.is_fork {
            return FilterDecision::Rejected(RejectReason::Fork);
        }

        let text = candidate.combined_text();

        if let Some(keyword) = self.negative.first_match(&text) {
            return FilterDecision::Rejected(RejectReason::NegativeKeyword(keyword.to_string()));
        }

        if candidate.is_official {
            return FilterDecision::Accepted(AcceptReason::Official);
        }

        if let Some(marker) = self.strong_positive.first_match(&text) {
            return FilterDecision::Accepted(AcceptReason::StrongPositive(marker.to_string()));
        }

        match self.positive.first_match(&text) {
            Some(keyword) => FilterDecision::Accepted(AcceptReason::Positive(keyword.to_string())),
            None => FilterDecision::Rejected(RejectReason::NoPositiveKeyword),
        }
    }

    /// Filter, rank and truncate a batch of candidates
    pub fn apply(&self, candidates: Vec<Candidate>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for candidate in candidates {
            match self.evaluate(&candidate) {
                FilterDecision::Accepted(reason) => {
                    debug!(name = %candidate.name, reason = ?reason, "Candidate accepted");
                    outcome.accepted.push(candidate);
                }
                FilterDecision::Rejected(reason) => {
                    debug!(name = %candidate.name, reason = %reason, "Candidate rejected");
                    outcome.rejected += 1;
                }
            }
        }

        rank(&mut outcome.accepted);

        if outcome.accepted.len() > self.max_candidates {
            outcome.truncated = outcome.accepted.len() - self.max_candidates;
            outcome.accepted.truncate(self.max_candidates);
        }

        info!(
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected,
            truncated = outcome.truncated,
            "Filtering complete"
        );

        outcome
    }
}

/// Total ranking order: official first, then popularity, recency and source id
pub fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    b.is_official
        .cmp(&a.is_official)
        .then_with(|| b.popularity_score.cmp(&a.popularity_score))
        .then_with(|| b.last_updated.cmp(&a.last_updated))
        .then_with(|| a.source_id.cmp(&b.source_id))
}

/// Sort candidates into processing order
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(compare);
}
