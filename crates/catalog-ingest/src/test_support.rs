//! In-memory repository index used by unit tests.

use crate::api::{ClientError, Manifest, ProbeResult, RepoDetail, RepoIndex, RepoOwner, RepoRecord};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub(crate) fn record(id: u64, owner: &str, name: &str, description: &str, stars: i64) -> RepoRecord {
    RepoRecord {
        id,
        name: name.to_string(),
        full_name: format!("{}/{}", owner, name),
        html_url: format!("https://github.com/{}/{}", owner, name),
        owner: RepoOwner {
            login: owner.to_string(),
            owner_type: Some("User".to_string()),
        },
        description: Some(description.to_string()),
        topics: Vec::new(),
        stargazers_count: stars,
        pushed_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        updated_at: None,
        homepage: None,
        license: None,
        default_branch: Some("main".to_string()),
        archived: false,
        fork: false,
    }
}

#[derive(Default)]
pub(crate) struct FakeIndex {
    pub searches: HashMap<String, Result<Vec<RepoRecord>, u16>>,
    pub rate_limited_queries: HashSet<String>,
    pub details: HashMap<String, RepoDetail>,
    pub failing_details: HashSet<String>,
    pub readmes: HashMap<String, String>,
    pub manifests: HashMap<String, Manifest>,
    pub existing_urls: HashSet<String>,
    pub rate_limited_probes: bool,
    pub probes: Mutex<Vec<String>>,
    pub search_calls: Mutex<Vec<(String, u32)>>,
}

impl FakeIndex {
    pub fn with_search(mut self, query: &str, records: Vec<RepoRecord>) -> Self {
        for record in &records {
            self.details.insert(record.full_name.clone(), record.clone());
        }
        self.searches.insert(query.to_string(), Ok(records));
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.lock().unwrap().len()
    }
}

#[async_trait]
impl RepoIndex for FakeIndex {
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RepoRecord>, ClientError> {
        self.search_calls
            .lock()
            .unwrap()
            .push((query.to_string(), page));
        if self.rate_limited_queries.contains(query) {
            return Err(ClientError::RateLimited {
                url: query.to_string(),
                retry_after_secs: None,
            });
        }
        match self.searches.get(query) {
            Some(Ok(records)) => Ok(records
                .iter()
                .skip(((page.max(1) - 1) * page_size) as usize)
                .take(page_size as usize)
                .cloned()
                .collect()),
            Some(Err(status)) => Err(ClientError::Status {
                url: query.to_string(),
                status: *status,
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn get_detail(&self, full_name: &str) -> Result<RepoDetail, ClientError> {
        if self.failing_details.contains(full_name) {
            return Err(ClientError::Status {
                url: full_name.to_string(),
                status: 500,
            });
        }
        self.details
            .get(full_name)
            .cloned()
            .ok_or_else(|| ClientError::Status {
                url: full_name.to_string(),
                status: 404,
            })
    }

    async fn get_readme(&self, full_name: &str) -> Result<Option<String>, ClientError> {
        Ok(self.readmes.get(full_name).cloned())
    }

    async fn get_manifest(&self, full_name: &str) -> Result<Option<Manifest>, ClientError> {
        Ok(self.manifests.get(full_name).cloned())
    }

    async fn probe(&self, url: &str) -> Result<ProbeResult, ClientError> {
        self.probes.lock().unwrap().push(url.to_string());
        if self.rate_limited_probes {
            return Err(ClientError::RateLimited {
                url: url.to_string(),
                retry_after_secs: None,
            });
        }
        if self.existing_urls.contains(url) {
            Ok(ProbeResult::Exists)
        } else {
            Ok(ProbeResult::NotFound)
        }
    }
}
