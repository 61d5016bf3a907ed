//! Rate-limited retry utilities for external endpoints with strict quotas.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts (first try included)
    pub max_attempts: u32,
    /// Multiplier applied to the penalty wait after each failure
    pub backoff_multiplier: f64,
    /// Ceiling for the penalty wait
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Shared pacing state for one external endpoint.
///
/// Enforces a minimum interval between consecutive calls across every caller
/// holding a reference to the gate. The interval is fixed at construction;
/// failure penalties are applied via [`RateGate::penalize`] and never inflate
/// the base interval, so an abandoned backoff sequence cannot slow down
/// later requests.
#[derive(Debug)]
pub struct RateGate {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateGate {
    /// Create a gate with the given minimum inter-call interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// The configured minimum inter-call interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until at least `interval` has passed since the previous call,
    /// then claim the current slot
    pub async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Sleep a failure penalty and claim the slot afterwards
    pub async fn penalize(&self, penalty: Duration) {
        sleep(penalty).await;
        let mut last = self.last_call.lock().await;
        *last = Some(Instant::now());
    }
}

/// Execute an async operation through a shared [`RateGate`] with bounded
/// retries and a doubling penalty wait.
///
/// Every attempt is paced by the gate. On failure the penalty wait starts at
/// the gate interval and is multiplied by `config.backoff_multiplier` per
/// attempt; after `config.max_attempts` failures the last error is returned.
/// The penalty state is local to this call, so a successful (or abandoned)
/// sequence leaves the gate's base interval untouched.
pub async fn with_paced_retry<T, F, Fut>(
    gate: &RateGate,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut penalty = gate.interval();

    for attempt in 1..=config.max_attempts {
        gate.pace().await;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        "operation succeeded on attempt {} after {} failures",
                        attempt,
                        attempt - 1
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if attempt == config.max_attempts {
                    tracing::warn!("operation failed after {} attempts: {}", attempt, error);
                    return Err(error);
                }

                penalty = penalty
                    .mul_f64(config.backoff_multiplier)
                    .min(config.max_delay);

                tracing::debug!(
                    "attempt {} failed ({}), retrying after {:?}",
                    attempt,
                    error,
                    penalty
                );

                gate.penalize(penalty).await;
            }
        }
    }

    // max_attempts is at least 1, so the loop always returns
    unreachable!("retry loop exited without a result")
}
