pub mod cancel;
pub mod commands;
pub mod http;
pub mod observe;
pub mod policy;

pub use cancel::{CancelHandle, CancelSignal};
pub use http::{FetchError, Fetcher, Response, Transport, TransportError, is_timeout_error};
pub use policy::{PolicyError, RetryPolicy};

#[cfg(test)]
pub mod test_utils;
