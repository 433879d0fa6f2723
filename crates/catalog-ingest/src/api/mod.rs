//! Repository index access.
//!
//! This module provides the [`RepoIndex`] interface the pipeline consumes,
//! a rate-limited GitHub implementation of it, and the response types.

pub mod client;
pub mod error;
pub mod rate_limiter;
pub mod types;

pub use client::GitHubClient;
pub use error::ClientError;
pub use rate_limiter::RateLimiter;
pub use types::*;

use async_trait::async_trait;

/// Read API of the external repository index
///
/// Every call made by an implementation must pass through the shared
/// [`RateLimiter`].
#[async_trait]
pub trait RepoIndex: Send + Sync {
    /// Search repositories; `page` is 1-based
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RepoRecord>, ClientError>;

    /// Extended metadata for one repository
    async fn get_detail(&self, full_name: &str) -> Result<RepoDetail, ClientError>;

    /// Readme text, `None` when the repository has none
    async fn get_readme(&self, full_name: &str) -> Result<Option<String>, ClientError>;

    /// Package manifest, `None` when absent
    async fn get_manifest(&self, full_name: &str) -> Result<Option<Manifest>, ClientError>;

    /// Lightweight existence check for an absolute URL
    async fn probe(&self, url: &str) -> Result<ProbeResult, ClientError>;
}
