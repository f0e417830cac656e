//! Retrying GET over a pluggable transport.

mod retry;
mod transport;

pub use retry::{FetchError, Fetcher, Outcome, is_cancelled_error, is_timeout_error};
pub use transport::{
    DEFAULT_USER_AGENT, ReqwestTransport, Response, Transport, TransportError,
    classify_reqwest_error,
};

#[cfg(test)]
pub use transport::MockTransport;
