//! Readiness gating for downstream dependencies.
//!
//! Startup must not proceed past a dependency that is not yet accepting
//! work. [`wait_until_ready`] polls a [`ReadinessProbe`] on the schedule
//! a [`RetryPolicy`] defines; once the budget is exhausted the gate
//! fails with the last probe error, and the operator has to intervene.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use thiserror::Error;

use crate::config::DatabaseConfig;

/// Fatal outcome of a gate whose retry budget ran out.
#[derive(Debug, Error)]
#[error("dependency '{name}' not ready after {attempts} attempts: {last_error}")]
pub struct GateExhausted {
    pub name: String,
    pub attempts: u32,
    pub last_error: String,
}

/// Retry schedule for a readiness gate: a bounded attempt budget and the
/// interval to wait between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration,
}

impl RetryPolicy {
    /// Fixed interval between attempts.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            initial_interval: interval,
            multiplier: 1.0,
            max_interval: interval,
        }
    }

    /// Multiplicative backoff starting at `initial_interval`, capped at
    /// `max_interval`.
    pub fn backoff(
        max_attempts: u32,
        initial_interval: Duration,
        multiplier: f64,
        max_interval: Duration,
    ) -> Self {
        Self {
            max_attempts,
            initial_interval,
            multiplier,
            max_interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Interval to wait after the given failed attempt (zero-based).
    pub fn interval_after(&self, attempt: u32) -> Duration {
        let scaled = self.initial_interval.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.max_interval.as_secs_f64()))
    }
}

/// A dependency that can report whether it is ready to accept work.
#[allow(async_fn_in_trait)]
pub trait ReadinessProbe {
    /// Name used in logs and gate errors.
    fn name(&self) -> &str;

    /// Run one readiness check. An `Err` means "not ready yet" and is
    /// retried within the policy's budget.
    async fn check(&self) -> anyhow::Result<()>;
}

/// Block until the probe reports ready, or the retry budget runs out.
///
/// Returns the number of attempts used on success.
pub async fn wait_until_ready<P: ReadinessProbe>(
    probe: &P,
    policy: &RetryPolicy,
) -> Result<u32, GateExhausted> {
    let mut last_error = String::from("no attempts were made");

    for attempt in 0..policy.max_attempts() {
        match probe.check().await {
            Ok(()) => {
                tracing::info!(
                    probe = probe.name(),
                    attempts = attempt + 1,
                    "Dependency ready"
                );
                return Ok(attempt + 1);
            }
            Err(e) => {
                last_error = e.to_string();
                if attempt + 1 < policy.max_attempts() {
                    let wait = policy.interval_after(attempt);
                    tracing::warn!(
                        probe = probe.name(),
                        attempt = attempt + 1,
                        max_attempts = policy.max_attempts(),
                        error = %last_error,
                        wait_ms = wait.as_millis() as u64,
                        "Dependency not ready, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    Err(GateExhausted {
        name: probe.name().to_string(),
        attempts: policy.max_attempts(),
        last_error,
    })
}

/// Probe that checks Postgres accepts connections for the configured
/// database name and user.
pub struct PostgresProbe {
    options: PgConnectOptions,
}

impl PostgresProbe {
    pub fn new(db: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .database(&db.name)
            .username(&db.user)
            .password(&db.password);

        Self { options }
    }
}

impl ReadinessProbe for PostgresProbe {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn check(&self) -> anyhow::Result<()> {
        let mut conn = PgConnection::connect_with(&self.options).await?;
        conn.ping().await?;
        conn.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Probe that fails a scripted number of times before reporting ready.
    struct FlakyProbe {
        failures_before_ready: u32,
        calls: AtomicU32,
    }

    impl FlakyProbe {
        fn new(failures_before_ready: u32) -> Self {
            Self {
                failures_before_ready,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ReadinessProbe for FlakyProbe {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn check(&self) -> anyhow::Result<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_ready {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_ready_on_first_attempt() {
        let probe = FlakyProbe::new(0);
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));

        let attempts = wait_until_ready(&probe, &policy).await.unwrap();
        assert_eq!(attempts, 1);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn test_ready_after_transient_failures() {
        let probe = FlakyProbe::new(3);
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));

        let attempts = wait_until_ready(&probe, &policy).await.unwrap();
        assert_eq!(attempts, 4);
        assert_eq!(probe.calls(), 4);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_is_fatal() {
        let probe = FlakyProbe::new(u32::MAX);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

        let err = wait_until_ready(&probe, &policy).await.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.name, "flaky");
        assert!(err.last_error.contains("connection refused"));
        // No probes beyond the budget.
        assert_eq!(probe.calls(), 3);
    }

    #[test]
    fn test_fixed_policy_interval_is_constant() {
        let policy = RetryPolicy::fixed(10, Duration::from_secs(3));
        assert_eq!(policy.interval_after(0), Duration::from_secs(3));
        assert_eq!(policy.interval_after(5), Duration::from_secs(3));
        assert_eq!(policy.interval_after(9), Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_policy_grows_and_caps() {
        let policy = RetryPolicy::backoff(
            10,
            Duration::from_millis(100),
            2.0,
            Duration::from_secs(1),
        );
        assert_eq!(policy.interval_after(0), Duration::from_millis(100));
        assert_eq!(policy.interval_after(1), Duration::from_millis(200));
        assert_eq!(policy.interval_after(2), Duration::from_millis(400));
        // Capped from here on.
        assert_eq!(policy.interval_after(4), Duration::from_secs(1));
        assert_eq!(policy.interval_after(9), Duration::from_secs(1));
    }
}
