//! Transport boundary: a single timed, cancellable GET.

use anyhow::anyhow;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode, header::HeaderMap};
use std::time::Duration;

use crate::cancel::CancelSignal;

/// User agent sent by [`ReqwestTransport`] unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("backoff-get/", env!("BACKOFF_GET_VERSION"));

/// Status line and headers of a completed request. The body is never read.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    url: String,
    headers: HeaderMap,
}

impl Response {
    pub fn new(status: StatusCode, url: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Final URL after redirects.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl From<&reqwest::Response> for Response {
    fn from(response: &reqwest::Response) -> Self {
        Self {
            status: response.status(),
            url: response.url().to_string(),
            headers: response.headers().clone(),
        }
    }
}

/// Failure of a single attempt, already sorted into what the retry loop needs.
#[derive(Debug)]
pub enum TransportError {
    /// The attempt ran past its deadline.
    TimedOut(anyhow::Error),
    /// The caller's cancellation signal fired while the attempt was running.
    Cancelled,
    /// Any other failure (connection refused, DNS, malformed URL, TLS...).
    Failed(anyhow::Error),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::TimedOut(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::TimedOut(err) => write!(f, "Request timed out: {}", err),
            TransportError::Cancelled => write!(f, "Request cancelled"),
            TransportError::Failed(err) => write!(f, "Request failed: {}", err),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::TimedOut(err) | TransportError::Failed(err) => Some(&**err),
            TransportError::Cancelled => None,
        }
    }
}

/// Sorts a `reqwest` error into a [`TransportError`].
///
/// Cancellation wins over a timeout when both apply.
pub fn classify_reqwest_error(error: reqwest::Error, cancel: &CancelSignal) -> TransportError {
    if cancel.is_signaled() {
        return TransportError::Cancelled;
    }
    if error.is_timeout() {
        return TransportError::TimedOut(anyhow::Error::from(error));
    }
    TransportError::Failed(anyhow::Error::from(error))
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues one GET to `url` that gives up after `timeout` or when `cancel` fires.
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        cancel: &CancelSignal,
    ) -> Result<Response, TransportError>;
}

/// [`Transport`] backed by `reqwest`.
///
/// Each attempt gets its own client, so connections never outlive the attempt.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    user_agent: String,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    fn build_client(&self, timeout: Duration) -> Result<Client, TransportError> {
        Client::builder()
            .user_agent(&self.user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                TransportError::Failed(anyhow!("Failed to build HTTP client: {}", e))
            })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, cancel))]
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        cancel: &CancelSignal,
    ) -> Result<Response, TransportError> {
        let client = self.build_client(timeout)?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("GET {} interrupted by cancellation", url);
                return Err(TransportError::Cancelled);
            }
            result = client.get(url).send() => result,
        };

        match result {
            Ok(response) => {
                debug!("GET {} -> {}", url, response.status());
                Ok(Response::from(&response))
            }
            Err(e) => Err(classify_reqwest_error(e, cancel)),
        }
    }
}
