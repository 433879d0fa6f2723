//! Remote catalog over HTTP.
//!
//! `GET {base}/servers?page=&page_size=` lists entries and
//! `POST {base}/servers` creates one; a 409 answer is a duplicate conflict.
//! Calls share the pipeline's rate limiter.

use super::{CatalogReader, CatalogWriter};
use crate::api::RateLimiter;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use shared::{CatalogError, CatalogPage, NewCatalogEntry};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Body of a successful create call
#[derive(Debug, Deserialize)]
struct Created {
    id: i64,
}

/// Body of an error response, when the catalog sends one
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "error")]
    message: Option<String>,
    #[serde(default)]
    field: Option<String>,
}

/// HTTP catalog backend
pub struct HttpCatalog {
    client: Client,
    base_url: String,
    token: Option<String>,
    rate_limiter: RateLimiter,
}

impl HttpCatalog {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        token: Option<String>,
        rate_limiter: RateLimiter,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create catalog HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            rate_limiter,
        })
    }

    pub fn servers_url(&self) -> String {
        format!("{}/servers", self.base_url)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, CatalogError> {
        debug!(url = %url, "Making catalog request");
        self.rate_limiter
            .throttle(|| request.send())
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Catalog request error");
                CatalogError::Other(anyhow!(e).context(format!("request to {} failed", url)))
            })
    }
}

async fn error_from(response: Response) -> CatalogError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();

    if status == StatusCode::CONFLICT {
        return CatalogError::DuplicateConflict {
            field: parsed.field.unwrap_or_else(|| "entry".to_string()),
        };
    }

    CatalogError::Request {
        status: status.as_u16(),
        message: parsed.message.unwrap_or(body),
    }
}

#[async_trait]
impl CatalogReader for HttpCatalog {
    async fn list_page(&self, page: u32, page_size: u32) -> Result<CatalogPage, CatalogError> {
        let url = self.servers_url();
        let request = self.authorize(
            self.client
                .get(&url)
                .query(&[("page", page), ("page_size", page_size)]),
        );

        let response = self.send(request, &url).await?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        let page = response
            .json::<CatalogPage>()
            .await
            .map_err(|e| CatalogError::Other(anyhow!(e).context("Failed to decode catalog page")))?;
        debug!(
            page = page.pagination.page,
            items = page.items.len(),
            total_pages = page.pagination.total_pages,
            "Listed remote catalog page"
        );
        Ok(page)
    }
}

#[async_trait]
impl CatalogWriter for HttpCatalog {
    async fn create(&self, entry: &NewCatalogEntry) -> Result<i64, CatalogError> {
        let url = self.servers_url();
        let request = self.authorize(self.client.post(&url).json(entry));

        let response = self.send(request, &url).await?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        let created = response
            .json::<Created>()
            .await
            .map_err(|e| CatalogError::Other(anyhow!(e).context("Failed to decode create response")))?;
        info!(id = created.id, slug = %entry.slug, "Created remote catalog entry");
        Ok(created.id)
    }
}
