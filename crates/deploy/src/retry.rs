//! Retry policies and a generic polling combinator.
//!
//! Both the endpoint resolver and the controller-readiness wait are
//! sleep-then-retry loops over an external read; [`poll_until`] carries the
//! shared shape so the loops stay declarative.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Bounded backoff policy for polling loops.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of polling attempts.
    pub max_attempts: u32,
    /// Delay after the first attempt.
    pub initial_delay: Duration,
    /// Ceiling for the computed delay.
    pub max_delay: Duration,
    /// Multiplier applied once per attempt. 1.0 gives a fixed interval.
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Delay to sleep after the given zero-based attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt.min(30)).unwrap_or(30);
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exp);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

/// Outcome of one polling probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Target state reached; stop polling.
    Ready(T),
    /// Not there yet (including swallowed transient read errors).
    NotReady,
}

/// Poll `probe` until it reports ready or the policy's attempts are
/// exhausted. Sleeps the policy delay between attempts, never after the
/// last one. Returns `None` on exhaustion.
pub async fn poll_until<T, F, Fut>(policy: &RetryPolicy, mut probe: F) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Probe<T>>,
{
    for attempt in 0..policy.max_attempts {
        if let Probe::Ready(value) = probe(attempt).await {
            return Some(value);
        }
        if attempt + 1 < policy.max_attempts {
            let delay = policy.delay_for_attempt(attempt);
            debug!(
                attempt = attempt + 1,
                delay_secs = delay.as_secs_f64(),
                "Not ready, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ingress_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 30,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            multiplier: 1.5,
        }
    }

    #[test]
    fn delay_sequence_starts_at_5s_and_caps_at_30s() {
        let policy = ingress_policy();

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(5000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(7500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(11250));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(16875));

        let mut previous = Duration::ZERO;
        for attempt in 0..30 {
            let delay = policy.delay_for_attempt(attempt);
            assert!(delay >= previous, "delay must be non-decreasing");
            assert!(delay <= Duration::from_secs(30), "delay must be capped");
            previous = delay;
        }
        assert_eq!(policy.delay_for_attempt(29), Duration::from_secs(30));
    }

    #[test]
    fn fixed_interval_policy_never_grows() {
        let policy = RetryPolicy {
            max_attempts: 30,
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(10),
            multiplier: 1.0,
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(10));
        assert_eq!(policy.delay_for_attempt(15), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_value_once_ready() {
        let calls = AtomicU32::new(0);
        let result = poll_until(&ingress_policy(), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 3 {
                    Probe::Ready("host")
                } else {
                    Probe::NotReady
                }
            }
        })
        .await;
        assert_eq!(result, Some("host"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Option<()> = poll_until(&ingress_policy(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Probe::NotReady }
        })
        .await;
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 30);
    }
}
