//! Command-line glue around the retrying fetcher.

mod fetch;
mod signal;

pub use fetch::{Completion, FetchConfig, fetch, run};
pub use signal::cancel_on_shutdown;
