//! Timeout-only retry loop with exponentially growing per-attempt deadlines.

use anyhow::anyhow;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

use super::transport::{ReqwestTransport, Response, Transport, TransportError};
use crate::cancel::CancelSignal;
use crate::observe::{AttemptObserver, TimeoutEvent};
use crate::policy::RetryPolicy;

/// Terminal failure of [`Fetcher::fetch`].
#[derive(Debug)]
pub enum FetchError {
    /// The caller cancelled. Not an application failure.
    Cancelled,
    /// Every attempt ran past its deadline.
    TimedOut {
        target: String,
        attempts: u32,
        /// Deadline of the last attempt.
        timeout: Duration,
        source: anyhow::Error,
    },
    /// A non-timeout failure. Never retried.
    Transport(anyhow::Error),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::TimedOut { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Cancelled => write!(f, "Request cancelled"),
            FetchError::TimedOut {
                target,
                attempts,
                timeout,
                ..
            } => write!(
                f,
                "Request to {} timed out after {} attempt(s), last timeout {:?}",
                target, attempts, timeout
            ),
            FetchError::Transport(err) => write!(f, "Request failed: {}", err),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Cancelled => None,
            FetchError::TimedOut { source, .. } => Some(&**source),
            FetchError::Transport(err) => Some(&**err),
        }
    }
}

/// Returns true if `err` is a timeout, whether it is a [`FetchError`], a
/// [`TransportError`], or a raw `reqwest` error.
pub fn is_timeout_error(err: &anyhow::Error) -> bool {
    if let Some(e) = err.downcast_ref::<FetchError>() {
        return e.is_timeout();
    }
    if let Some(e) = err.downcast_ref::<TransportError>() {
        return e.is_timeout();
    }
    if let Some(e) = err.downcast_ref::<reqwest::Error>() {
        return e.is_timeout();
    }
    false
}

/// Returns true if `err` reports caller cancellation.
pub fn is_cancelled_error(err: &anyhow::Error) -> bool {
    if let Some(e) = err.downcast_ref::<FetchError>() {
        return e.is_cancelled();
    }
    if let Some(e) = err.downcast_ref::<TransportError>() {
        return e.is_cancelled();
    }
    false
}

/// What one attempt amounted to.
#[derive(Debug)]
pub enum Outcome {
    Success(Response),
    Timeout(anyhow::Error),
    TransportError(anyhow::Error),
    Cancelled,
}

impl Outcome {
    /// Classifies the result of one attempt.
    ///
    /// A raised signal turns any result into [`Outcome::Cancelled`], since the
    /// transport may have surfaced the cancellation as a plain error.
    pub fn classify(result: Result<Response, TransportError>, cancel: &CancelSignal) -> Self {
        if cancel.is_signaled() {
            return Outcome::Cancelled;
        }
        match result {
            Ok(response) => Outcome::Success(response),
            Err(TransportError::Cancelled) => Outcome::Cancelled,
            Err(TransportError::TimedOut(err)) => Outcome::Timeout(err),
            Err(TransportError::Failed(err)) => Outcome::TransportError(err),
        }
    }
}

/// Issues GET requests until one finishes without timing out.
///
/// Attempt `i` runs with a deadline of `unit * exponent^i`. Only timeouts are
/// retried; any response, whatever its status, ends the loop.
pub struct Fetcher<T: Transport> {
    transport: T,
    policy: RetryPolicy,
    observer: Option<Arc<dyn AttemptObserver>>,
}

impl Fetcher<ReqwestTransport> {
    pub fn with_reqwest(policy: RetryPolicy) -> Self {
        Self::new(ReqwestTransport::new(), policy)
    }
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[tracing::instrument(skip(self, cancel))]
    pub async fn fetch(&self, cancel: &CancelSignal, url: &str) -> Result<Response, FetchError> {
        let max_attempts = self.policy.max_attempts();
        let mut timeout = self.policy.unit();
        let mut last_timeout = None;

        for attempt in 0..max_attempts {
            if cancel.is_signaled() {
                debug!("{}: cancelled before attempt {}", url, attempt + 1);
                return Err(FetchError::Cancelled);
            }

            debug!(
                "{}: attempt {}/{} with timeout {:?}",
                url,
                attempt + 1,
                max_attempts,
                timeout
            );

            let current = timeout;
            let result = self.transport.get(url, current, cancel).await;
            timeout = self.policy.next_timeout(timeout);

            match Outcome::classify(result, cancel) {
                Outcome::Success(response) => return Ok(response),
                Outcome::Cancelled => {
                    debug!("{}: cancelled during attempt {}", url, attempt + 1);
                    return Err(FetchError::Cancelled);
                }
                Outcome::TransportError(err) => {
                    debug!("{}: non-retryable error: {}", url, err);
                    return Err(FetchError::Transport(err));
                }
                Outcome::Timeout(err) => {
                    debug!("{}: attempt {} timed out after {:?}", url, attempt + 1, current);
                    if let Some(observer) = &self.observer {
                        observer.on_timeout(&TimeoutEvent {
                            target: url.to_string(),
                            attempt,
                            timeout: current,
                        });
                    }
                    last_timeout = Some((current, err));
                }
            }
        }

        let (timeout, source) = last_timeout.unwrap_or_else(|| {
            (
                Duration::ZERO,
                anyhow!("{}: no attempts were made", url),
            )
        });
        Err(FetchError::TimedOut {
            target: url.to_string(),
            attempts: max_attempts,
            timeout,
            source,
        })
    }
}
