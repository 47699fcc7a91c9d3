//! # Shared HTTP Plumbing
//!
//! Every HTTP adapter wraps a `reqwest::Client` with a base URL and a
//! per-request timeout. The collaborator traits are synchronous, so each
//! call enters the current Tokio runtime with `Handle::block_on`. Callers
//! run adapters on the blocking pool (`spawn_blocking`), never on a runtime
//! worker thread.
//!
//! Retries are not built in: a failed call surfaces as an error and the
//! engine fails the Transaction.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Transport-level failures shared by all adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// Bad base URL or client construction failure.
    #[error("HTTP client configuration: {0}")]
    Config(String),

    /// Called outside a Tokio runtime.
    #[error("no async runtime available for {operation}")]
    NoRuntime {
        /// Operation name.
        operation: String,
    },

    /// Request exceeded the timeout.
    #[error("{operation} timed out after {elapsed_ms}ms")]
    Timeout {
        /// Operation name.
        operation: String,
        /// Configured timeout.
        elapsed_ms: u64,
    },

    /// Connection or protocol failure.
    #[error("{operation}: {reason}")]
    Transport {
        /// Operation name.
        operation: String,
        /// Underlying error.
        reason: String,
    },

    /// Non-2xx response.
    #[error("{operation}: HTTP {status} {body}")]
    Status {
        /// Operation name.
        operation: String,
        /// HTTP status.
        status: u16,
        /// Response body excerpt.
        body: String,
    },

    /// 2xx response whose body could not be decoded.
    #[error("{operation}: response deserialization failed: {reason}")]
    Decode {
        /// Operation name.
        operation: String,
        /// Decoder error.
        reason: String,
    },
}

impl HttpError {
    /// Whether the peer could not be reached (as opposed to answering badly).
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::NoRuntime { .. } | Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Config(_) | Self::Decode { .. } => false,
        }
    }
}

const BODY_EXCERPT: usize = 256;

/// A base URL plus a configured `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpClient {
    /// Build a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, HttpError> {
        let base_url = Url::parse(base_url).map_err(|e| HttpError::Config(format!("invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(HttpError::Config(format!("{base_url} cannot be a base URL")));
        }
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` with `segments` appended, each percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, HttpError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HttpError::Config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Run `fut` to completion on the current runtime.
    pub fn block_on<F: Future>(&self, operation: &str, fut: F) -> Result<F::Output, HttpError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| HttpError::NoRuntime {
            operation: operation.to_string(),
        })?;
        Ok(rt.block_on(fut))
    }

    /// Send a request; map transport failures and non-2xx statuses.
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<reqwest::Response, HttpError> {
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout {
                    operation: operation.to_string(),
                    elapsed_ms: self.timeout.as_millis() as u64,
                }
            } else {
                HttpError::Transport {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            body.truncate(BODY_EXCERPT);
            tracing::warn!(operation, status = status.as_u16(), "collaborator returned an error status");
            return Err(HttpError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    /// GET `url` and decode JSON. A 404 is `Ok(None)`.
    pub async fn get_optional<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        operation: &str,
    ) -> Result<Option<T>, HttpError> {
        match self.send(self.client.get(url), operation).await {
            Ok(resp) => decode(resp, operation).await.map(Some),
            Err(HttpError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// POST JSON and decode the JSON answer.
    pub async fn post_json<B: Serialize + ?Sized, T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
        operation: &str,
    ) -> Result<T, HttpError> {
        let resp = self.send(self.client.post(url).json(body), operation).await?;
        decode(resp, operation).await
    }

    /// POST JSON, ignoring the answer body.
    pub async fn post_unit<B: Serialize + ?Sized>(&self, url: Url, body: &B, operation: &str) -> Result<(), HttpError> {
        self.send(self.client.post(url).json(body), operation).await?;
        Ok(())
    }

    /// PUT JSON, ignoring the answer body.
    pub async fn put_unit<B: Serialize + ?Sized>(&self, url: Url, body: &B, operation: &str) -> Result<(), HttpError> {
        self.send(self.client.put(url).json(body), operation).await?;
        Ok(())
    }
}

async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response, operation: &str) -> Result<T, HttpError> {
    resp.json().await.map_err(|e| HttpError::Decode {
        operation: operation.to_string(),
        reason: e.to_string(),
    })
}
