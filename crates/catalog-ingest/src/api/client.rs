//! GitHub REST client with rate limiting.
//!
//! The client never retries on its own: a failed call surfaces as a
//! [`ClientError`] and the caller decides whether to skip or cool down.

use super::error::ClientError;
use super::rate_limiter::RateLimiter;
use super::types::*;
use super::RepoIndex;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const MAX_PAGE_SIZE: u32 = 100;

/// GitHub API v3 client
pub struct GitHubClient {
    /// HTTP client
    client: Client,
    /// Base URL for the API
    base_url: String,
    /// Shared rate limiter
    rate_limiter: RateLimiter,
    /// Optional bearer token
    token: Option<String>,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(
        base_url: String,
        user_agent: &str,
        timeout: Duration,
        token: Option<String>,
        rate_limiter: RateLimiter,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter,
            token,
        })
    }

    fn request(&self, method: Method, url: &str, accept: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// Send a request through the rate limiter
    ///
    /// Returns the raw response for 2xx and 404 so callers can decide what
    /// "not found" means for them; every other status becomes an error.
    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, ClientError> {
        debug!(url = %url, "Making API request");

        let response = self
            .rate_limiter
            .throttle(|| request.send())
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Request error");
                ClientError::from_reqwest(url, e)
            })?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(response);
        }

        if is_rate_limited(status, response.headers()) {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            warn!(url = %url, status = %status, retry_after_secs, "Rate limited by server");
            return Err(ClientError::RateLimited {
                url: url.to_string(),
                retry_after_secs,
            });
        }

        warn!(url = %url, status = %status, "Request failed");
        Err(ClientError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<Option<T>, ClientError> {
        let response = self.send(request, url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let data = response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(data))
    }

    fn not_found(url: &str) -> ClientError {
        ClientError::Status {
            url: url.to_string(),
            status: StatusCode::NOT_FOUND.as_u16(),
        }
    }
}

/// GitHub signals an exhausted quota with 429, or 403 and a zero remaining count
fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    status == StatusCode::FORBIDDEN
        && headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false)
}

#[async_trait]
impl RepoIndex for GitHubClient {
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RepoRecord>, ClientError> {
        info!(query = %query, page, "Searching repositories");
        let url = format!("{}/search/repositories", self.base_url);
        let per_page = page_size.clamp(1, MAX_PAGE_SIZE).to_string();
        let page = page.max(1).to_string();
        let request = self.request(Method::GET, &url, JSON_MEDIA_TYPE).query(&[
            ("q", query),
            ("sort", "stars"),
            ("order", "desc"),
            ("per_page", per_page.as_str()),
            ("page", page.as_str()),
        ]);

        let response: SearchResponse = self
            .get_json(request, &url)
            .await?
            .ok_or_else(|| Self::not_found(&url))?;
        Ok(response.items)
    }

    async fn get_detail(&self, full_name: &str) -> Result<RepoDetail, ClientError> {
        debug!(repo = %full_name, "Fetching repository details");
        let url = format!("{}/repos/{}", self.base_url, full_name);
        let request = self.request(Method::GET, &url, JSON_MEDIA_TYPE);
        self.get_json(request, &url)
            .await?
            .ok_or_else(|| Self::not_found(&url))
    }

    async fn get_readme(&self, full_name: &str) -> Result<Option<String>, ClientError> {
        debug!(repo = %full_name, "Fetching readme");
        let url = format!("{}/repos/{}/readme", self.base_url, full_name);
        let request = self.request(Method::GET, &url, RAW_MEDIA_TYPE);
        let response = self.send(request, &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(&url, e))?;
        Ok(Some(text))
    }

    async fn get_manifest(&self, full_name: &str) -> Result<Option<Manifest>, ClientError> {
        debug!(repo = %full_name, "Fetching package manifest");
        let url = format!("{}/repos/{}/contents/package.json", self.base_url, full_name);
        let request = self.request(Method::GET, &url, RAW_MEDIA_TYPE);
        let response = self.send(request, &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(&url, e))?;
        let manifest = serde_json::from_str(&body).map_err(|e| ClientError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(manifest))
    }

    async fn probe(&self, url: &str) -> Result<ProbeResult, ClientError> {
        debug!(url = %url, "Probing URL");
        let request = self.client.request(Method::HEAD, url);
        let response = self.send(request, url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(ProbeResult::NotFound)
        } else {
            Ok(ProbeResult::Exists)
        }
    }
}
