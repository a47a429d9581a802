//! Backoff retries for gateway calls
//!
//! [`RetryPolicy`] re-runs an operation while it fails with a transient
//! error. [`CallPolicy`] wraps each attempt in a timeout and reports the
//! final failure as [`WayfarerError::ToolInvocation`].
//!
//! # Example
//!
//! ```rust,ignore
//! use wayfarer::resilience::{CallPolicy, RetryConfig};
//!
//! let policy = CallPolicy::new(RetryConfig::default(), Duration::from_secs(30));
//! let result = policy
//!     .call("directions_tool", || async { gateway.call_tool(&request).await })
//!     .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Result, WayfarerError};

/// Backoff schedule for a retried gateway call
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single wait
    pub max_delay: Duration,
    /// Growth factor between consecutive waits
    pub backoff_multiplier: f64,
    /// Relative spread applied to each wait, within 0.0..=1.0
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl RetryConfig {
    /// No retries at all: one attempt per call
    pub fn none() -> Self {
        Self::default().with_max_retries(0)
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Out-of-range values are clamped into 0.0..=1.0
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }
}

/// Last error of a retried operation, with the number of attempts made.
#[derive(Debug)]
pub struct Exhausted {
    pub attempts: u32,
    pub error: WayfarerError,
}

/// Runs an operation until it succeeds, fails permanently, or runs out of
/// attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// First attempt plus retries
    pub fn max_attempts(&self) -> u32 {
        self.config.max_retries.saturating_add(1)
    }

    /// Wait before retry number `retry` (0 = first retry).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let cfg = &self.config;
        let growth = cfg.backoff_multiplier.powi(retry.min(i32::MAX as u32) as i32);
        // f64::min drops NaN/inf, so the cap always wins on overflow
        let secs = (cfg.initial_delay.as_secs_f64() * growth).min(cfg.max_delay.as_secs_f64());
        let base = Duration::from_secs_f64(secs);

        if cfg.jitter <= 0.0 {
            return base;
        }
        let spread = rand::thread_rng().gen_range(-cfg.jitter..=cfg.jitter);
        base.mul_f64((1.0 + spread).max(0.0))
    }

    /// Run `operation`, retrying errors for which
    /// [`WayfarerError::is_recoverable`] holds.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> std::result::Result<T, Exhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !error.is_recoverable() || attempt >= self.max_attempts() {
                        return Err(Exhausted {
                            attempts: attempt,
                            error,
                        });
                    }

                    let delay = self.delay_for(attempt - 1);
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Per-call policy for gateway tool calls: timeout per attempt + retries.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    retry: RetryPolicy,
    timeout: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default(), Duration::from_secs(30))
    }
}

impl CallPolicy {
    pub fn new(retry: RetryConfig, timeout: Duration) -> Self {
        Self {
            retry: RetryPolicy::new(retry),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry.max_attempts()
    }

    /// Run `operation` for `tool` under this policy.
    ///
    /// Each attempt is bounded by the timeout (a timeout counts as a transient
    /// failure). When attempts run out, or a non-transient error occurs, the
    /// error is reported as `ToolInvocation`.
    pub async fn call<F, Fut, T>(&self, tool: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timeout = self.timeout;
        let outcome = self
            .retry
            .execute(|| {
                let attempt = operation();
                async move {
                    match tokio::time::timeout(timeout, attempt).await {
                        Ok(result) => result,
                        Err(_) => Err(WayfarerError::ToolTimeout {
                            tool: tool.to_string(),
                            timeout_ms: timeout.as_millis() as u64,
                        }),
                    }
                }
            })
            .await;

        outcome.map_err(|Exhausted { attempts, error }| {
            warn!(tool, attempts, error = %error, "Tool call failed");
            WayfarerError::ToolInvocation {
                tool: tool.to_string(),
                attempts,
                reason: error.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn quick(max_retries: u32) -> RetryConfig {
        RetryConfig::none()
            .with_max_retries(max_retries)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(0.0)
    }

    fn reset(tool: &str) -> WayfarerError {
        WayfarerError::ToolCall {
            tool: tool.to_string(),
            reason: "connection reset".to_string(),
        }
    }

    /// Operation that fails with `error()` for the first `failures` attempts.
    fn flaky(
        failures: u32,
        error: fn() -> WayfarerError,
    ) -> (Arc<Mutex<u32>>, impl FnMut() -> std::future::Ready<Result<&'static str>>) {
        let seen = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&seen);
        let op = move || {
            let mut n = counter.lock();
            *n += 1;
            std::future::ready(if *n <= failures { Err(error()) } else { Ok("routed") })
        };
        (seen, op)
    }

    #[test]
    fn test_none_means_single_attempt() {
        assert_eq!(RetryPolicy::new(RetryConfig::none()).max_attempts(), 1);
        assert_eq!(RetryPolicy::new(RetryConfig::default()).max_attempts(), 3);
    }

    #[test]
    fn test_jitter_is_clamped() {
        assert_eq!(RetryConfig::default().with_jitter(3.0).jitter, 1.0);
        assert_eq!(RetryConfig::default().with_jitter(-1.0).jitter, 0.0);
    }

    #[test]
    fn test_delay_grows_then_caps() {
        let policy = RetryPolicy::new(
            RetryConfig::none()
                .with_initial_delay(Duration::from_millis(200))
                .with_max_delay(Duration::from_millis(1_000))
                .with_backoff_multiplier(3.0)
                .with_jitter(0.0),
        );

        let waits: Vec<u128> = (0..4).map(|r| policy.delay_for(r).as_millis()).collect();
        assert_eq!(waits, vec![200, 600, 1_000, 1_000]);
    }

    #[test]
    fn test_jittered_delay_stays_in_band() {
        let policy = RetryPolicy::new(
            RetryConfig::none()
                .with_initial_delay(Duration::from_millis(400))
                .with_jitter(0.25),
        );

        for _ in 0..50 {
            let wait = policy.delay_for(0);
            assert!(wait >= Duration::from_millis(300), "{:?}", wait);
            assert!(wait <= Duration::from_millis(500), "{:?}", wait);
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let (seen, op) = flaky(2, || reset("matrix_tool"));

        let value = RetryPolicy::new(quick(2)).execute(op).await.unwrap();

        assert_eq!(value, "routed");
        assert_eq!(*seen.lock(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_carries_attempt_count() {
        let (seen, op) = flaky(u32::MAX, || reset("matrix_tool"));

        let exhausted = RetryPolicy::new(quick(1)).execute(op).await.unwrap_err();

        assert_eq!(exhausted.attempts, 2);
        assert_eq!(exhausted.error.code(), "WF-083");
        assert_eq!(*seen.lock(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let (seen, op) = flaky(u32::MAX, || WayfarerError::GatewayProtocol {
            name: "mapbox".to_string(),
            reason: "bad frame".to_string(),
        });

        let exhausted = RetryPolicy::new(quick(5)).execute(op).await.unwrap_err();

        assert_eq!(exhausted.attempts, 1);
        assert_eq!(*seen.lock(), 1);
    }

    #[tokio::test]
    async fn test_slow_attempts_time_out_into_tool_invocation() {
        let policy = CallPolicy::new(quick(1), Duration::from_millis(10));

        let err = policy
            .call("directions_tool", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        match err {
            WayfarerError::ToolInvocation {
                tool,
                attempts,
                reason,
            } => {
                assert_eq!(tool, "directions_tool");
                assert_eq!(attempts, 2);
                assert!(reason.contains("WF-084"));
            }
            other => panic!("Expected ToolInvocation, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_call_policy_returns_value_on_success() {
        let (seen, op) = flaky(1, || reset("search_and_geocode_tool"));

        let value = CallPolicy::new(quick(1), Duration::from_secs(1))
            .call("search_and_geocode_tool", op)
            .await
            .unwrap();

        assert_eq!(value, "routed");
        assert_eq!(*seen.lock(), 2);
    }
}
