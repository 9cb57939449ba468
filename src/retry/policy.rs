use backon::BackoffBuilder;
use std::time::Duration;

const DEFAULT_NAME: &str = "retryable function";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_STEP: Duration = Duration::from_secs(3);

/// Maps a 0-based retry index to the wait before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DelayPolicy {
    Fixed(Duration),
    /// `base + step * n`
    Increment { base: Duration, step: Duration },
    /// `base * factor^n`; factors below 1 are treated as 1.
    Exponential { base: Duration, factor: f64 },
}

impl DelayPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed(delay)
    }

    pub fn increment(base: Duration, step: Duration) -> Self {
        Self::Increment { base, step }
    }

    pub fn exponential(base: Duration, factor: f64) -> Self {
        Self::Exponential {
            base,
            factor: factor.max(1.0),
        }
    }

    /// Wait before retry number `attempt` (0-based). Saturates at `Duration::MAX`.
    pub fn delay(&self, attempt: usize) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Increment { base, step } => {
                let n = u32::try_from(attempt).unwrap_or(u32::MAX);
                base.saturating_add(step.saturating_mul(n))
            }
            Self::Exponential { base, factor } => {
                if base.is_zero() {
                    return Duration::ZERO;
                }
                // NaN.max(1.0) is 1.0
                let factor = factor.max(1.0);
                let n = i32::try_from(attempt).unwrap_or(i32::MAX);
                Duration::try_from_secs_f64(base.as_secs_f64() * factor.powi(n))
                    .unwrap_or(Duration::MAX)
            }
        }
    }
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_RETRY_STEP)
    }
}

/// Named, bounded retry configuration.
///
/// `max_attempts` counts invocations of the operation, so a policy with
/// `max_attempts = 3` waits at most twice.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    name: String,
    max_attempts: u32,
    delay: DelayPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DelayPolicy::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(name: impl Into<String>, max_attempts: u32, delay: DelayPolicy) -> Self {
        Self::default()
            .with_name(name)
            .with_max_attempts(max_attempts)
            .with_delay(delay)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Zero is clamped to a single attempt.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: DelayPolicy) -> Self {
        self.delay = delay;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> &DelayPolicy {
        &self.delay
    }
}

/// Finite delay sequence for one run: yields `max_attempts - 1` waits.
#[derive(Debug, Clone)]
pub struct PolicyBackoff {
    delay: DelayPolicy,
    next_index: usize,
    remaining: u32,
}

impl Iterator for PolicyBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let delay = self.delay.delay(self.next_index);
        self.next_index += 1;
        Some(delay)
    }
}

impl BackoffBuilder for RetryPolicy {
    type Backoff = PolicyBackoff;

    fn build(self) -> Self::Backoff {
        PolicyBackoff {
            delay: self.delay,
            next_index: 0,
            remaining: self.max_attempts.saturating_sub(1),
        }
    }
}
