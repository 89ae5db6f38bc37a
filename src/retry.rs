use crate::error::FetchError;
use crate::pacing::{Clock, Pacer};
use std::time::Duration;

/// Bounded retry with backoff for remote requests.
///
/// Only `FetchError::Transient` is retried. Rate-limited failures back off
/// linearly (`base_delay × attempt`); other transient failures wait `base_delay`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(5) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay }
    }

    /// Backoff after the `attempt`-th (1-based) failure.
    pub fn delay_after(&self, attempt: u32, err: &FetchError) -> Duration {
        match err {
            FetchError::Transient { rate_limited: true, .. } => self.base_delay * attempt.max(1),
            _ => self.base_delay,
        }
    }

    /// Run `op`, pacing every attempt and sleeping between retries.
    /// Returns the last error once attempts are exhausted or the error is not retryable.
    pub fn execute<T, C, P, F>(&self, clock: &C, pacer: &mut P, label: &str, mut op: F) -> Result<T, FetchError>
    where
        C: Clock + ?Sized,
        P: Pacer + ?Sized,
        F: FnMut() -> Result<T, FetchError>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            pacer.wait_if_needed();
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < max => {
                    let wait = self.delay_after(attempt, &e);
                    tracing::warn!("{label}: {e} (attempt {attempt}/{max}); retrying in {:.1}s", wait.as_secs_f64());
                    clock.sleep(wait);
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::error!("{label}: failed after {max} attempts: {e}");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::{IntervalPacer, ManualClock};

    fn setup() -> (ManualClock, IntervalPacer<ManualClock>, RetryPolicy) {
        let clock = ManualClock::new();
        let pacer = IntervalPacer::new(clock.clone(), Duration::ZERO);
        (clock, pacer, RetryPolicy::new(3, Duration::from_secs(5)))
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let (clock, mut pacer, policy) = setup();
        let mut calls = 0;
        let out = policy.execute(&clock, &mut pacer, "search", || {
            calls += 1;
            if calls < 3 { Err(FetchError::transient("timeout")) } else { Ok(calls) }
        });
        assert_eq!(out, Ok(3));
        assert_eq!(clock.total_slept(), Duration::from_secs(10));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let (clock, mut pacer, policy) = setup();
        let mut calls = 0;
        let out: Result<(), _> = policy.execute(&clock, &mut pacer, "search", || {
            calls += 1;
            Err(FetchError::rate_limited("429"))
        });
        assert!(matches!(out, Err(FetchError::Transient { rate_limited: true, .. })));
        assert_eq!(calls, 3);
        // 5s after the first failure, 10s after the second.
        assert_eq!(clock.total_slept(), Duration::from_secs(15));
    }

    #[test]
    fn auth_and_rejected_are_not_retried() {
        let (clock, mut pacer, policy) = setup();
        for err in [FetchError::Auth("401".into()), FetchError::Rejected("404".into())] {
            let mut calls = 0;
            let out: Result<(), _> = policy.execute(&clock, &mut pacer, "search", || {
                calls += 1;
                Err(err.clone())
            });
            assert_eq!(out, Err(err));
            assert_eq!(calls, 1);
        }
        assert_eq!(clock.total_slept(), Duration::ZERO);
    }
}
