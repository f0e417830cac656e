use anyhow::{Context, Result};
use log::info;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    cancel::CancelSignal,
    http::{FetchError, Fetcher, Transport},
    observe::LogObserver,
    policy::RetryPolicy,
};

/// Settings collected from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub url: String,
    pub attempts: u32,
    pub exponent: u32,
    pub unit: Duration,
}

impl FetchConfig {
    pub fn policy(&self) -> Result<RetryPolicy> {
        let policy = RetryPolicy::new(self.attempts, self.exponent)
            .context("Invalid retry policy")?
            .with_unit(self.unit)
            .context("Invalid retry policy")?;
        Ok(policy)
    }
}

/// How a fetch ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed(StatusCode),
    Cancelled,
}

/// Fetches `config.url` over `reqwest`, logging every timeout.
#[tracing::instrument(skip(config, cancel))]
pub async fn fetch(config: &FetchConfig, cancel: &CancelSignal) -> Result<Completion> {
    let fetcher = Fetcher::with_reqwest(config.policy()?).with_observer(Arc::new(LogObserver));
    run(&fetcher, &config.url, cancel).await
}

/// Runs one fetch and folds cancellation into a successful [`Completion`].
///
/// Timeouts and transport failures are returned as errors.
pub async fn run<T: Transport>(
    fetcher: &Fetcher<T>,
    url: &str,
    cancel: &CancelSignal,
) -> Result<Completion> {
    match fetcher.fetch(cancel, url).await {
        Ok(response) => {
            info!("Request to {} completed with {}", url, response.status());
            Ok(Completion::Completed(response.status()))
        }
        Err(FetchError::Cancelled) => {
            info!("Request to {} cancelled", url);
            Ok(Completion::Cancelled)
        }
        Err(e) => Err(anyhow::Error::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel;
    use crate::http::{MockTransport, Response, TransportError, is_timeout_error};
    use crate::policy::PolicyError;
    use anyhow::anyhow;

    fn config(attempts: u32, exponent: u32) -> FetchConfig {
        FetchConfig {
            url: "http://test".to_string(),
            attempts,
            exponent,
            unit: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_policy_from_config() {
        let policy = config(3, 2).policy().unwrap();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.exponent(), 2);
    }

    #[test]
    fn test_policy_from_config_rejects_zero() {
        let err = config(0, 2).policy().unwrap_err();
        assert_eq!(
            err.downcast_ref::<PolicyError>(),
            Some(&PolicyError::InvalidAttempts)
        );

        let err = config(1, 0).policy().unwrap_err();
        assert_eq!(
            err.downcast_ref::<PolicyError>(),
            Some(&PolicyError::InvalidExponent)
        );

        let mut zero_unit = config(1, 2);
        zero_unit.unit = Duration::ZERO;
        let err = zero_unit.policy().unwrap_err();
        assert_eq!(
            err.downcast_ref::<PolicyError>(),
            Some(&PolicyError::InvalidUnit)
        );
    }

    #[tokio::test]
    async fn test_run_completed() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|url, _, _| Ok(Response::new(StatusCode::ACCEPTED, url)));

        let fetcher = Fetcher::new(transport, config(3, 2).policy().unwrap());
        let completion = run(&fetcher, "http://test", &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(completion, Completion::Completed(StatusCode::ACCEPTED));
    }

    #[tokio::test]
    async fn test_run_cancelled_is_not_an_error() {
        let mut transport = MockTransport::new();
        transport.expect_get().times(0);

        let (handle, signal) = cancel::channel();
        handle.cancel();

        let fetcher = Fetcher::new(transport, config(3, 2).policy().unwrap());
        let completion = run(&fetcher, "http://test", &signal).await.unwrap();

        assert_eq!(completion, Completion::Cancelled);
    }

    #[tokio::test]
    async fn test_run_timeout_is_an_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(2)
            .returning(|_, _, _| Err(TransportError::TimedOut(anyhow!("deadline"))));

        let fetcher = Fetcher::new(transport, config(2, 2).policy().unwrap());
        let err = run(&fetcher, "http://test", &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(is_timeout_error(&err));
    }

    #[tokio::test]
    async fn test_run_transport_failure_is_an_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_, _, _| Err(TransportError::Failed(anyhow!("dns lookup failed"))));

        let fetcher = Fetcher::new(transport, config(5, 2).policy().unwrap());
        let err = run(&fetcher, "http://test", &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(!is_timeout_error(&err));
        assert!(err.to_string().contains("dns lookup failed"));
    }

    #[tokio::test]
    async fn test_fetch_against_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/status")
            .with_status(503)
            .create_async()
            .await;

        let mut config = config(3, 2);
        config.url = format!("{}/status", server.url());

        let completion = fetch(&config, &CancelSignal::never()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            completion,
            Completion::Completed(StatusCode::SERVICE_UNAVAILABLE)
        );
    }
}
