//! Wait-for-result engine
//!
//! The single blocking-poll-with-timeout combinator behind mount slew
//! confirmation, wheel lock confirmation and dome motion confirmation.
//! Devices on these links expose no completion events, only pollable state
//! words; every "do X and confirm" operation funnels through here rather
//! than growing its own ad hoc loop.

use std::fmt;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;

use crate::cancel::CancelToken;

/// Poll cadence and budget for one wait. Invariants checked at
/// construction: the timeout is positive and the delay is shorter than the
/// timeout, so the engine always terminates in finite time.
#[derive(Debug, Clone, Copy)]
pub struct WaitSpec {
    delay: Duration,
    timeout: Duration,
}

impl WaitSpec {
    pub fn new(delay: Duration, timeout: Duration) -> Result<Self, WaitError> {
        if timeout.is_zero() {
            return Err(WaitError::InvalidSpec {
                reason: "timeout must be positive".to_string(),
            });
        }
        if delay >= timeout {
            return Err(WaitError::InvalidSpec {
                reason: format!(
                    "poll delay {:?} must be shorter than timeout {:?}",
                    delay, timeout
                ),
            });
        }
        Ok(Self { delay, timeout })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("invalid wait spec: {reason}")]
    InvalidSpec { reason: String },

    /// The polled operation never reached an accepted result inside the
    /// budget. Always surfaced: it means hardware did not reach a safe
    /// state.
    #[error(
        "'{operation}' timed out after {elapsed:?}: waiting for one of {accepted:?}, \
         last result {last:?}"
    )]
    Timeout {
        operation: String,
        accepted: Vec<String>,
        last: Option<String>,
        elapsed: Duration,
    },

    #[error("'{operation}' cancelled while waiting")]
    Cancelled { operation: String },

    #[error("'{operation}' poll failed: {message}")]
    PollFailed { operation: String, message: String },
}

/// Poll `poll_fn` against `ctx` until it yields a result in `accepted`.
///
/// The first poll happens immediately; a hit returns with zero sleeps.
/// Otherwise the engine sleeps `spec.delay()` between polls until the
/// elapsed time reaches `spec.timeout()`, then raises
/// [`WaitError::Timeout`] naming the operation and the accepted set.
/// Cancellation is honored between polls. A poll error aborts the wait
/// immediately.
pub async fn wait_for_result<C, T, E, F>(
    operation: &str,
    ctx: &mut C,
    mut poll_fn: F,
    accepted: &[T],
    spec: WaitSpec,
    cancel: &CancelToken,
) -> Result<T, WaitError>
where
    C: ?Sized,
    T: PartialEq + fmt::Display,
    E: fmt::Display,
    F: for<'a> FnMut(&'a mut C) -> BoxFuture<'a, Result<T, E>>,
{
    let started = Instant::now();
    let mut last: Option<String> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled {
                operation: operation.to_string(),
            });
        }

        let result = poll_fn(ctx)
            .await
            .map_err(|err| WaitError::PollFailed {
                operation: operation.to_string(),
                message: err.to_string(),
            })?;

        if accepted.iter().any(|a| *a == result) {
            debug!(operation, result = %result, elapsed = ?started.elapsed(), "wait satisfied");
            return Ok(result);
        }
        last = Some(result.to_string());
        debug!(operation, result = %result, "wait not yet satisfied");

        if started.elapsed() >= spec.timeout() {
            return Err(WaitError::Timeout {
                operation: operation.to_string(),
                accepted: accepted.iter().map(|a| a.to_string()).collect(),
                last,
                elapsed: started.elapsed(),
            });
        }
        tokio::time::sleep(spec.delay()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn spec(delay_ms: u64, timeout_ms: u64) -> WaitSpec {
        WaitSpec::new(
            Duration::from_millis(delay_ms),
            Duration::from_millis(timeout_ms),
        )
        .unwrap()
    }

    #[test]
    fn test_spec_rejects_zero_timeout() {
        let err = WaitSpec::new(Duration::from_millis(5), Duration::ZERO).unwrap_err();
        assert!(matches!(err, WaitError::InvalidSpec { .. }));
    }

    #[test]
    fn test_spec_rejects_delay_at_or_over_timeout() {
        let err =
            WaitSpec::new(Duration::from_millis(20), Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, WaitError::InvalidSpec { .. }));
    }

    #[tokio::test]
    async fn test_immediate_success_makes_one_poll() {
        let cancel = CancelToken::new();
        let mut calls = 0u32;
        let started = Instant::now();
        let result = wait_for_result(
            "already ready",
            &mut calls,
            |calls| {
                async move {
                    *calls += 1;
                    Ok::<_, String>("ready")
                }
                .boxed()
            },
            &["ready"],
            spec(50, 500),
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(result, "ready");
        assert_eq!(calls, 1);
        // No sleep happened on first success.
        assert!(started.elapsed() < Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_accepts_after_three_sleeps() {
        let cancel = CancelToken::new();
        let mut responses = vec!["busy", "busy", "busy", "ready"].into_iter();
        let result = wait_for_result(
            "wheel lock",
            &mut responses,
            |responses| {
                async move { Ok::<_, String>(responses.next().unwrap_or("busy")) }.boxed()
            },
            &["ready"],
            spec(5, 20),
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(result, "ready");
    }

    #[tokio::test]
    async fn test_timeout_poll_count() {
        let cancel = CancelToken::new();
        let mut calls = 0u32;
        let err = wait_for_result(
            "never ready",
            &mut calls,
            |calls| {
                async move {
                    *calls += 1;
                    Ok::<_, String>("busy")
                }
                .boxed()
            },
            &["ready"],
            spec(25, 100),
            &cancel,
        )
        .await
        .unwrap_err();

        match err {
            WaitError::Timeout {
                operation,
                accepted,
                last,
                ..
            } => {
                assert_eq!(operation, "never ready");
                assert_eq!(accepted, vec!["ready".to_string()]);
                assert_eq!(last.as_deref(), Some("busy"));
            }
            other => panic!("expected timeout, got {other}"),
        }
        // floor(timeout/delay) + 1 = 5 polls, +/- 1 for scheduling slop.
        assert!((4..=6).contains(&calls), "made {} polls", calls);
    }

    #[tokio::test]
    async fn test_cancellation_stops_wait() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut calls = 0u32;
        let err = wait_for_result(
            "cancelled wait",
            &mut calls,
            |calls| {
                async move {
                    *calls += 1;
                    Ok::<_, String>("busy")
                }
                .boxed()
            },
            &["ready"],
            spec(5, 50),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WaitError::Cancelled { .. }));
        assert_eq!(calls, 0, "no poll after cancellation");
    }

    #[tokio::test]
    async fn test_poll_error_propagates() {
        let cancel = CancelToken::new();
        let err = wait_for_result(
            "broken poll",
            &mut (),
            |_| async move { Err::<&str, _>("socket gone".to_string()) }.boxed(),
            &["ready"],
            spec(5, 50),
            &cancel,
        )
        .await
        .unwrap_err();
        match err {
            WaitError::PollFailed { message, .. } => assert!(message.contains("socket gone")),
            other => panic!("expected poll failure, got {other}"),
        }
    }
}
