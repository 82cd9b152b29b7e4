//! Retry budget and backoff policy for start sequences.

use std::time::Duration;

use rand::Rng;

use crate::core::{ConfigError, DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF};

/// Delay between failed start attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay after every failure.
    Fixed(Duration),
    /// `initial * 2^(failures-1)`, capped at `max`.
    Exponential {
        /// Delay after the first failure.
        initial: Duration,
        /// Cap on any single delay.
        max: Duration,
        /// Spread each delay by +/- 25%.
        jitter: bool,
    },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_BACKOFF)
    }
}

impl BackoffPolicy {
    /// Jittered exponential policy.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self::Exponential {
            initial,
            max,
            jitter: true,
        }
    }

    /// Delay after `failures` failed attempts, before jitter.
    pub fn base_delay(&self, failures: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { initial, max, .. } => {
                let factor = 1u32 << failures.clamp(1, 17).saturating_sub(1);
                initial.saturating_mul(factor).min(max)
            }
        }
    }

    /// Delay after `failures` failed attempts.
    pub fn delay(&self, failures: u32) -> Duration {
        let base = self.base_delay(failures);
        match *self {
            Self::Exponential {
                jitter: true, max, ..
            } => {
                let base_ms = base.as_millis() as u64;
                let range = base_ms / 4;
                let offset = if range > 0 {
                    rand::thread_rng().gen_range(0..=range * 2)
                } else {
                    0
                };
                let max_ms = max.as_millis() as u64;
                Duration::from_millis((base_ms - range + offset).min(max_ms))
            }
            _ => base,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Self::Exponential { initial, max, .. } = *self {
            if initial.is_zero() {
                return Err(ConfigError::InvalidBackoff(
                    "exponential backoff needs a non-zero initial delay".into(),
                ));
            }
            if initial > max {
                return Err(ConfigError::InvalidBackoff(format!(
                    "initial delay {initial:?} exceeds cap {max:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Retry settings for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Transport start attempts per start sequence.
    pub max_attempts: u32,
    /// Delay between failed attempts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryConfig {
    /// Exponential policy starting at the default delay.
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: BackoffPolicy::exponential(DEFAULT_BACKOFF, DEFAULT_MAX_BACKOFF),
        }
    }

    /// Check the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidAttempts);
        }
        self.backoff.validate()
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then try again.
    RetryAfter(Duration),
    /// Budget spent.
    Exhausted,
}

/// Attempt counter for one start sequence.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    config: RetryConfig,
}

impl RetryState {
    /// Fresh counter.
    pub fn new(config: RetryConfig) -> Self {
        Self { attempt: 0, config }
    }

    /// Failed attempts so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Attempts left in the budget.
    pub fn remaining(&self) -> u32 {
        self.config.max_attempts.saturating_sub(self.attempt)
    }

    /// Whether the budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Count a failure and decide what happens next.
    pub fn record_failure(&mut self) -> RetryDecision {
        self.attempt = self.attempt.saturating_add(1);
        if self.attempt < self.config.max_attempts {
            RetryDecision::RetryAfter(self.config.backoff.delay(self.attempt))
        } else {
            RetryDecision::Exhausted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_is_three_attempts_two_seconds() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff, BackoffPolicy::Fixed(Duration::from_secs(2)));
    }

    #[test]
    fn test_fixed_budget() {
        let mut state = RetryState::new(RetryConfig::default());
        assert_eq!(
            state.record_failure(),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(
            state.record_failure(),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(state.record_failure(), RetryDecision::Exhausted);
        assert!(state.is_exhausted());
        assert_eq!(state.attempt(), 3);
    }

    #[test]
    fn test_single_attempt_budget() {
        let mut state = RetryState::new(RetryConfig {
            max_attempts: 1,
            backoff: BackoffPolicy::default(),
        });
        assert_eq!(state.record_failure(), RetryDecision::Exhausted);
    }

    #[test]
    fn test_exponential_growth_and_cap() {
        let policy = BackoffPolicy::Exponential {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(3),
            jitter: false,
        };
        assert_eq!(policy.delay(1), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_millis(1000));
        assert_eq!(policy.delay(3), Duration::from_millis(2000));
        assert_eq!(policy.delay(4), Duration::from_secs(3));
        assert_eq!(policy.delay(40), Duration::from_secs(3));
    }

    #[test]
    fn test_validate() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(RetryConfig::exponential(5).validate().is_ok());
        assert_eq!(
            RetryConfig {
                max_attempts: 0,
                backoff: BackoffPolicy::default()
            }
            .validate(),
            Err(ConfigError::InvalidAttempts)
        );
        let inverted = RetryConfig {
            max_attempts: 3,
            backoff: BackoffPolicy::exponential(Duration::from_secs(10), Duration::from_secs(1)),
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::InvalidBackoff(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_jitter_stays_within_quarter(initial_ms in 1u64..5_000, failures in 1u32..12) {
            let policy = BackoffPolicy::exponential(
                Duration::from_millis(initial_ms),
                Duration::from_secs(60),
            );
            let base = policy.base_delay(failures).as_millis() as u64;
            let delay = policy.delay(failures).as_millis() as u64;
            prop_assert!(delay >= base - base / 4);
            prop_assert!(delay <= (base + base / 4).min(60_000));
        }

        #[test]
        fn prop_budget_allows_exactly_max_attempts(max in 1u32..20) {
            let mut state = RetryState::new(RetryConfig {
                max_attempts: max,
                backoff: BackoffPolicy::default(),
            });
            let retries = (0..max)
                .map(|_| state.record_failure())
                .filter(|d| matches!(d, RetryDecision::RetryAfter(_)))
                .count();
            prop_assert_eq!(retries as u32, max - 1);
            prop_assert!(state.is_exhausted());
        }
    }
}
