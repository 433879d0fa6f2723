//! Repository index response types.
//!
//! These types mirror the GitHub REST API v3 shapes that the pipeline reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<RepoRecord>,
}

/// Repository record, as returned by search and by the detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoRecord {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub owner: RepoOwner,
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub stargazers_count: i64,
    pub pushed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub homepage: Option<String>,
    pub license: Option<RepoLicense>,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
}

/// Extended repository metadata
pub type RepoDetail = RepoRecord;

/// Repository owner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoOwner {
    pub login: String,
    #[serde(rename = "type", default)]
    pub owner_type: Option<String>,
}

/// License block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoLicense {
    pub key: Option<String>,
    pub spdx_id: Option<String>,
    pub name: Option<String>,
}

impl RepoLicense {
    /// SPDX identifier when known, else the display name
    pub fn identifier(&self) -> Option<String> {
        self.spdx_id
            .clone()
            .filter(|id| !id.is_empty() && id != "NOASSERTION")
            .or_else(|| self.name.clone())
    }
}

/// Package manifest (package.json)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub license: Option<ManifestLicense>,
    pub homepage: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// `license` may be an SPDX string or the legacy `{ "type": ... }` object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ManifestLicense {
    Spdx(String),
    Object {
        #[serde(rename = "type")]
        license_type: String,
    },
}

impl ManifestLicense {
    pub fn as_str(&self) -> &str {
        match self {
            ManifestLicense::Spdx(id) => id,
            ManifestLicense::Object { license_type } => license_type,
        }
    }
}

/// Outcome of a lightweight existence check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Exists,
    NotFound,
}
