//! Attempt budget and timeout growth for the retrying fetcher.

use std::time::Duration;

/// Default time unit: the first attempt gets one second.
pub const DEFAULT_UNIT: Duration = Duration::from_secs(1);

/// Errors raised while building a [`RetryPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    /// The attempt budget was zero.
    InvalidAttempts,
    /// The growth exponent was zero.
    InvalidExponent,
    /// The time unit was zero.
    InvalidUnit,
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::InvalidAttempts => write!(f, "Attempts cannot be zero"),
            PolicyError::InvalidExponent => write!(f, "Exponent cannot be zero"),
            PolicyError::InvalidUnit => write!(f, "Time unit cannot be zero"),
        }
    }
}

impl std::error::Error for PolicyError {}

/// Immutable retry policy.
///
/// Attempt `i` (0-based) runs with a timeout of `unit * exponent^i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    exponent: u32,
    unit: Duration,
}

impl RetryPolicy {
    /// Builds a policy with the default one-second unit.
    ///
    /// The attempt budget is validated before the exponent.
    pub fn new(max_attempts: u32, exponent: u32) -> Result<Self, PolicyError> {
        if max_attempts == 0 {
            return Err(PolicyError::InvalidAttempts);
        }
        if exponent == 0 {
            return Err(PolicyError::InvalidExponent);
        }
        Ok(Self {
            max_attempts,
            exponent,
            unit: DEFAULT_UNIT,
        })
    }

    /// Returns a copy of this policy whose first attempt uses `unit`.
    pub fn with_unit(self, unit: Duration) -> Result<Self, PolicyError> {
        if unit.is_zero() {
            return Err(PolicyError::InvalidUnit);
        }
        Ok(Self { unit, ..self })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    pub fn unit(&self) -> Duration {
        self.unit
    }

    /// Timeout that follows `current`. Saturates instead of overflowing.
    pub fn next_timeout(&self, current: Duration) -> Duration {
        current.saturating_mul(self.exponent)
    }

    /// Timeout for the given 0-based attempt index.
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        (0..attempt).fold(self.unit, |timeout, _| self.next_timeout(timeout))
    }

    /// The full per-attempt timeout sequence allowed by this policy.
    pub fn timeouts(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::successors(Some(self.unit), move |t| Some(self.next_timeout(*t)))
            .take(self.max_attempts as usize)
    }
}
