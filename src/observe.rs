//! Optional hooks for watching attempts as they time out.

use log::info;
use std::time::Duration;

/// A single attempt that exceeded its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutEvent {
    pub target: String,
    /// 0-based index of the attempt that timed out.
    pub attempt: u32,
    /// Deadline the attempt ran with.
    pub timeout: Duration,
}

#[cfg_attr(test, mockall::automock)]
pub trait AttemptObserver: Send + Sync {
    fn on_timeout(&self, event: &TimeoutEvent);
}

/// Forwards timeout events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl AttemptObserver for LogObserver {
    fn on_timeout(&self, event: &TimeoutEvent) {
        info!(
            "event=timeout target={} attempt={} timeout_ms={}",
            event.target,
            event.attempt,
            event.timeout.as_millis()
        );
    }
}
