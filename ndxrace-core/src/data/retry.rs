//! Bounded exponential backoff for provider calls.
//!
//! The policy is a plain value so the same schedule drives the Yahoo
//! provider in production and fake clients in tests.

use super::provider::FetchError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry schedule: `base_delay * multiplier^(n-1)` before the n-th retry,
/// capped at `max_delay`, plus up to `jitter` (fraction) of random slack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    /// Fraction of the computed delay added at random, in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Retries without any waiting. Intended for tests and offline providers.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            multiplier: 1.0,
            max_delay_ms: 0,
            jitter: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".into());
        }
        if !(self.multiplier.is_finite() && self.multiplier >= 1.0) {
            return Err(format!(
                "retry.multiplier must be >= 1.0, got {}",
                self.multiplier
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(format!("retry.jitter must be in [0, 1], got {}", self.jitter));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            ));
        }
        Ok(())
    }

    /// Deterministic part of the wait before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(30) as i32;
        let ms = self.base_delay_ms as f64 * self.multiplier.powi(exp);
        Duration::from_millis(ms.min(self.max_delay_ms as f64) as u64)
    }

    /// Full wait before retry number `retry`, honouring a server hint but
    /// never exceeding `max_delay`.
    fn delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let max = Duration::from_millis(self.max_delay_ms);
        let mut delay = self.backoff(retry);
        if let Some(hint) = retry_after {
            delay = delay.max(hint);
        }
        if self.jitter > 0.0 && !delay.is_zero() {
            let slack: f64 = rand::thread_rng().gen_range(0.0..=self.jitter);
            delay += delay.mul_f64(slack);
        }
        delay.min(max)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out,
    /// sleeping the calling thread between attempts.
    pub fn run<T, F>(&self, ticker: &str, op: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Result<T, FetchError>,
    {
        self.run_with_sleep(ticker, op, std::thread::sleep)
    }

    /// Like [`run`](Self::run) with an injectable sleep, so tests can record
    /// the schedule instead of waiting.
    ///
    /// `op` receives the 1-based attempt number. An exhausted `Transient`
    /// error is converted to `DataUnavailable`.
    pub fn run_with_sleep<T, F, S>(&self, ticker: &str, mut op: F, mut sleep: S) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Result<T, FetchError>,
        S: FnMut(Duration),
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(FetchError::Transient {
                    reason,
                    retry_after,
                }) => {
                    if attempt >= attempts {
                        warn!("{ticker}: giving up after {attempt} attempt(s): {reason}");
                        return Err(FetchError::unavailable(
                            ticker,
                            format!("gave up after {attempt} attempt(s): {reason}"),
                        ));
                    }
                    let wait = self.delay(attempt, retry_after);
                    debug!(
                        "{ticker}: attempt {attempt}/{attempts} failed ({reason}); retrying in {wait:?}"
                    );
                    sleep(wait);
                    attempt += 1;
                }
                Err(permanent) => return Err(permanent),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 100,
            multiplier: 2.0,
            max_delay_ms: 500,
            jitter: 0.0,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::default()
        };
        let mut sleeps = Vec::new();
        let result = policy.run_with_sleep(
            "AAPL",
            |attempt| {
                if attempt < 3 {
                    Err(FetchError::transient("timeout"))
                } else {
                    Ok(attempt)
                }
            },
            |d| sleeps.push(d),
        );
        assert_eq!(result, Ok(3));
        assert_eq!(
            sleeps,
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[test]
    fn exhausted_transient_becomes_unavailable() {
        let policy = RetryPolicy::immediate(3);
        let mut calls = 0;
        let result: Result<(), _> = policy.run_with_sleep(
            "MSFT",
            |_| {
                calls += 1;
                Err(FetchError::transient("HTTP 503"))
            },
            |_| {},
        );
        assert_eq!(calls, 3);
        match result {
            Err(FetchError::DataUnavailable { ticker, reason }) => {
                assert_eq!(ticker, "MSFT");
                assert!(reason.contains("3 attempt"));
                assert!(reason.contains("HTTP 503"));
            }
            other => panic!("expected DataUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn permanent_error_is_not_retried() {
        let policy = RetryPolicy::immediate(5);
        let mut calls = 0;
        let result: Result<(), _> = policy.run_with_sleep(
            "ZZZZ",
            |_| {
                calls += 1;
                Err(FetchError::unavailable("ZZZZ", "symbol not found"))
            },
            |_| panic!("must not sleep"),
        );
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(FetchError::DataUnavailable { .. })));
    }

    #[test]
    fn retry_after_hint_is_honoured_and_capped() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 100,
            multiplier: 2.0,
            max_delay_ms: 2_000,
            jitter: 0.0,
        };
        let mut sleeps = Vec::new();
        let _: Result<(), _> = policy.run_with_sleep(
            "NVDA",
            |attempt| {
                Err(FetchError::Transient {
                    reason: "HTTP 429".into(),
                    retry_after: Some(Duration::from_secs(if attempt == 1 { 1 } else { 60 })),
                })
            },
            |d| sleeps.push(d),
        );
        assert_eq!(
            sleeps,
            vec![Duration::from_secs(1), Duration::from_millis(2_000)]
        );
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1_000,
            multiplier: 2.0,
            max_delay_ms: 10_000,
            jitter: 0.5,
        };
        for _ in 0..50 {
            let d = policy.delay(1, None);
            assert!(d >= Duration::from_millis(1_000));
            assert!(d <= Duration::from_millis(1_500));
        }
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        }
        .validate()
        .is_err());
        assert!(RetryPolicy {
            jitter: 1.5,
            ..RetryPolicy::default()
        }
        .validate()
        .is_err());
        assert!(RetryPolicy {
            multiplier: 0.5,
            ..RetryPolicy::default()
        }
        .validate()
        .is_err());
    }
}
