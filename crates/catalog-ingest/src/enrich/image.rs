//! Image selection with reachability probes.
//!
//! Guesses come from image references in the readme first, then from
//! conventional paths under the repository's raw-content root. Each guess is
//! verified with a probe; the number of probes per run is bounded.

use super::rules::ExtractionRule;
use crate::api::{ProbeResult, RepoIndex};
use shared::Candidate;
use tracing::{debug, warn};

const BADGE_MARKERS: &[&str] = &[
    "shields.io",
    "badge",
    "travis-ci",
    "codecov",
    "/workflows/",
    "img.youtube",
];

/// Outcome of resolving one candidate's image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageChoice {
    pub url: String,
    /// Probing stopped because the index signalled its rate limit
    pub rate_limited: bool,
}

/// Picks a verified image URL for a candidate
pub struct ImageResolver {
    raw_base_url: String,
    suffixes: Vec<String>,
    fallback_url: String,
    probes_remaining: usize,
}

impl ImageResolver {
    pub fn new(raw_base_url: &str, suffixes: Vec<String>, fallback_url: String, probe_budget: usize) -> Self {
        Self {
            raw_base_url: raw_base_url.trim_end_matches('/').to_string(),
            suffixes,
            fallback_url,
            probes_remaining: probe_budget,
        }
    }

    pub fn probes_remaining(&self) -> usize {
        self.probes_remaining
    }

    /// Raw-content root of the candidate's default branch
    pub fn hosting_root(&self, candidate: &Candidate) -> String {
        let branch = candidate.default_branch.as_deref().unwrap_or("HEAD");
        format!("{}/{}/{}", self.raw_base_url, candidate.full_name, branch)
    }

    /// Turn an image reference into an absolute URL
    pub fn resolve_reference(&self, reference: &str, root: &str) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() || reference.starts_with("data:") || reference.starts_with('#') {
            return None;
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            // Blob pages render HTML; point at the raw file instead
            if let Some(rest) = reference.strip_prefix("https://github.com/") {
                if rest.contains("/blob/") {
                    return Some(format!("{}/{}", self.raw_base_url, rest.replacen("/blob/", "/", 1)));
                }
            }
            return Some(reference.to_string());
        }
        if let Some(rest) = reference.strip_prefix("//") {
            return Some(format!("https://{}", rest));
        }
        let path = reference.trim_start_matches("./").trim_start_matches('/');
        Some(format!("{}/{}", root, path))
    }

    /// Ordered, de-duplicated image guesses for a candidate
    pub fn guesses(&self, rules: &[ExtractionRule], candidate: &Candidate, text: &str) -> Vec<String> {
        let root = self.hosting_root(candidate);
        let mut guesses: Vec<String> = Vec::new();

        let references = rules.iter().flat_map(|rule| rule.all(text));
        for reference in references {
            let Some(url) = self.resolve_reference(&reference, &root) else {
                continue;
            };
            let lower = url.to_lowercase();
            if BADGE_MARKERS.iter().any(|m| lower.contains(m)) {
                continue;
            }
            if !guesses.contains(&url) {
                guesses.push(url);
            }
        }

        for suffix in &self.suffixes {
            let url = format!("{}/{}", root, suffix.trim_start_matches('/'));
            if !guesses.contains(&url) {
                guesses.push(url);
            }
        }

        guesses
    }

    /// First guess that probes as existing, else the fallback
    ///
    /// A rate-limited probe ends probing for this candidate; the caller is
    /// told so it can cool down before the next call.
    pub async fn resolve(
        &mut self,
        index: &dyn RepoIndex,
        rules: &[ExtractionRule],
        candidate: &Candidate,
        text: &str,
    ) -> ImageChoice {
        let mut rate_limited = false;
        for url in self.guesses(rules, candidate, text) {
            if self.probes_remaining == 0 {
                debug!(name = %candidate.name, "Probe budget exhausted, using fallback image");
                break;
            }
            self.probes_remaining -= 1;

            match index.probe(&url).await {
                Ok(ProbeResult::Exists) => {
                    debug!(name = %candidate.name, url = %url, "Verified image");
                    return ImageChoice {
                        url,
                        rate_limited: false,
                    };
                }
                Ok(ProbeResult::NotFound) => continue,
                Err(e) if e.is_rate_limited() => {
                    warn!(name = %candidate.name, error = %e, "Image probing rate limited");
                    rate_limited = true;
                    break;
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "Image probe failed");
                    continue;
                }
            }
        }

        ImageChoice {
            url: self.fallback_url.clone(),
            rate_limited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discovery;
    use crate::enrich::rules::image_rules;
    use crate::test_support::{record, FakeIndex};

    fn candidate() -> Candidate {
        let discovery = Discovery::new(
            std::sync::Arc::new(FakeIndex::default()),
            crate::api::RateLimiter::new(std::time::Duration::ZERO),
            &shared::config::IngestConfig::default(),
        );
        discovery.candidate_from_record(record(1, "acme", "tool", "x", 5))
    }

    fn resolver(budget: usize) -> ImageResolver {
        ImageResolver::new(
            "https://raw.githubusercontent.com/",
            vec!["logo.png".to_string(), "assets/icon.png".to_string()],
            "https://example.com/fallback.png".to_string(),
            budget,
        )
    }

    const ROOT: &str = "https://raw.githubusercontent.com/acme/tool/main";

    #[test]
    fn test_resolve_reference() {
        let r = resolver(10);
        assert_eq!(
            r.resolve_reference("./docs/shot.png", ROOT).as_deref(),
            Some("https://raw.githubusercontent.com/acme/tool/main/docs/shot.png")
        );
        assert_eq!(
            r.resolve_reference("https://github.com/acme/tool/blob/main/logo.png", ROOT).as_deref(),
            Some("https://raw.githubusercontent.com/acme/tool/main/logo.png")
        );
        assert_eq!(
            r.resolve_reference("//cdn.acme.dev/x.png", ROOT).as_deref(),
            Some("https://cdn.acme.dev/x.png")
        );
        assert!(r.resolve_reference("data:image/png;base64,AAAA", ROOT).is_none());
    }

    #[test]
    fn test_guesses_skip_badges_and_end_with_suffixes() {
        let text = "[![CI](https://img.shields.io/badge/ci-passing.svg)](x)\n![logo](assets/logo.png)";
        let guesses = resolver(10).guesses(&image_rules(), &candidate(), text);
        assert_eq!(
            guesses,
            vec![
                format!("{ROOT}/assets/logo.png"),
                format!("{ROOT}/logo.png"),
                format!("{ROOT}/assets/icon.png"),
            ]
        );
    }

    #[tokio::test]
    async fn test_first_existing_guess_wins() {
        let mut index = FakeIndex::default();
        index.existing_urls.insert(format!("{ROOT}/logo.png"));
        let mut r = resolver(10);

        let choice = r.resolve(&index, &image_rules(), &candidate(), "no images here").await;
        assert_eq!(choice.url, format!("{ROOT}/logo.png"));
        assert!(!choice.rate_limited);
        assert_eq!(index.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_when_nothing_verifies() {
        let index = FakeIndex::default();
        let mut r = resolver(10);

        let choice = r.resolve(&index, &image_rules(), &candidate(), "").await;
        assert_eq!(choice.url, "https://example.com/fallback.png");
        assert_eq!(index.probe_count(), 2);
        assert_eq!(r.probes_remaining(), 8);
    }

    #[tokio::test]
    async fn test_budget_bounds_probes() {
        let mut index = FakeIndex::default();
        index.existing_urls.insert(format!("{ROOT}/assets/icon.png"));
        let mut r = resolver(1);

        let choice = r.resolve(&index, &image_rules(), &candidate(), "").await;
        assert_eq!(choice.url, "https://example.com/fallback.png");
        assert_eq!(index.probe_count(), 1);

        // Spent budget means no more probes for later candidates
        let choice = r.resolve(&index, &image_rules(), &candidate(), "").await;
        assert_eq!(choice.url, "https://example.com/fallback.png");
        assert!(!choice.rate_limited);
        assert_eq!(index.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_image_lookup_stops_and_is_reported() {
        let mut index = FakeIndex::default();
        index.rate_limited_probes = true;
        index.existing_urls.insert(format!("{ROOT}/assets/icon.png"));
        let mut r = resolver(10);

        let choice = r.resolve(&index, &image_rules(), &candidate(), "").await;
        assert_eq!(choice.url, "https://example.com/fallback.png");
        assert!(choice.rate_limited);
        assert_eq!(index.probe_count(), 1);
    }
}
