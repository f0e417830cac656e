use anyhow::Result;
use backoff_get::cancel;
use backoff_get::commands::{self, Completion, FetchConfig};
use clap::Parser;
use std::time::Duration;

/// backoff-get - GET a URL, retrying timeouts with exponentially longer deadlines
///
/// Attempt N (0-based) waits UNIT * EXPONENT^N before giving up. Only timeouts
/// are retried; any HTTP response, including 4xx and 5xx, ends the run.
///
/// Exit status is 0 on a response or on Ctrl+C, 1 when every attempt timed
/// out or the request failed for another reason.
///
/// Examples:
///   backoff-get https://httpbin.org/delay/3
///   backoff-get https://example.com --attempts 5 --exponent 3
#[derive(Parser, Debug)]
#[command(author, version = env!("BACKOFF_GET_VERSION"), about)]
struct Cli {
    /// The URL to fetch
    #[arg(value_name = "URL")]
    pub url: String,

    /// Maximum number of attempts (also via BACKOFF_ATTEMPTS)
    #[arg(
        long,
        short = 'a',
        env = "BACKOFF_ATTEMPTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub attempts: u32,

    /// Factor applied to the timeout after each attempt (also via BACKOFF_EXPONENT)
    #[arg(
        long,
        short = 'e',
        env = "BACKOFF_EXPONENT",
        default_value_t = 2,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub exponent: u32,

    /// Timeout of the first attempt in milliseconds (also via BACKOFF_UNIT_MS)
    #[arg(
        long = "unit-ms",
        value_name = "MS",
        env = "BACKOFF_UNIT_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub unit_ms: u64,
}

impl Cli {
    fn into_config(self) -> FetchConfig {
        FetchConfig {
            url: self.url,
            attempts: self.attempts,
            exponent: self.exponent,
            unit: Duration::from_millis(self.unit_ms),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Cli::parse().into_config();

    let (handle, signal) = cancel::channel();
    let listener = commands::cancel_on_shutdown(handle);

    let result = commands::fetch(&config, &signal).await;
    listener.abort();

    match result? {
        Completion::Completed(status) => println!("request completed {}.", status.as_u16()),
        Completion::Cancelled => {}
    }
    Ok(())
}
