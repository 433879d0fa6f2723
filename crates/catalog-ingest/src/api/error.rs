//! Errors raised by outbound calls to the repository index.

use thiserror::Error;

/// Transient failure of a single outbound call
#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// The upstream rate limit was exceeded; callers should cool down
    #[error("rate limit exceeded for {url}")]
    RateLimited {
        url: String,
        retry_after_secs: Option<u64>,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ClientError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ClientError::RateLimited { .. })
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ClientError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_decode() {
            ClientError::Decode {
                url: url.to_string(),
                message: error.to_string(),
            }
        } else {
            ClientError::Network {
                url: url.to_string(),
                source: error,
            }
        }
    }
}
