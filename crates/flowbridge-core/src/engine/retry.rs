//! Retry with exponential backoff for a single step.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, ErrorCode, ProxyError};
use crate::models::{ProxyResponse, RetryPolicy};

/// Result of running a step to completion (with or without retries).
#[derive(Debug)]
pub struct StepRun {
    /// Response of the final attempt, if any attempt completed.
    pub last: Option<ProxyResponse>,
    pub attempts: u32,
    pub result: Result<(), EngineError>,
}

/// Run `attempt` until it succeeds or the policy gives up.
///
/// Without a policy the step is attempted exactly once. An attempt's `Err`
/// is only used for abort conditions such as cancellation and ends the run
/// immediately. Backoff sleeps race the cancellation token.
pub async fn run_with_retry<F, Fut>(
    step_id: &str,
    policy: Option<&RetryPolicy>,
    cancel: &CancellationToken,
    mut attempt: F,
) -> StepRun
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<ProxyResponse, EngineError>>,
{
    let max_retries = policy.map(|p| p.max_retries).unwrap_or(0);
    let factor = policy.map(RetryPolicy::effective_backoff).unwrap_or(1.0);
    let mut delay = policy.map(|p| p.retry_delay).unwrap_or_default();
    let mut last: Option<ProxyResponse> = None;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let response = match attempt(attempts).await {
            Ok(response) => response,
            Err(err) => {
                return StepRun {
                    last,
                    attempts,
                    result: Err(err),
                }
            }
        };

        if response.success {
            return StepRun {
                last: Some(response),
                attempts,
                result: Ok(()),
            };
        }

        let error = response.error.clone().unwrap_or_else(|| {
            ProxyError::new(
                ErrorCode::InternalError,
                "proxy reported failure without an error",
            )
        });
        last = Some(response);

        if policy.is_none() || !error.retryable {
            if policy.is_some() {
                tracing::debug!(step = step_id, code = %error.code, "non-retryable failure, giving up");
            }
            return StepRun {
                last,
                attempts,
                result: Err(EngineError::StepFailed {
                    step: step_id.to_string(),
                    error,
                }),
            };
        }

        if attempts > max_retries {
            return StepRun {
                last,
                attempts,
                result: Err(EngineError::RetriesExhausted {
                    step: step_id.to_string(),
                    attempts,
                    last: error,
                }),
            };
        }

        tracing::debug!(
            step = step_id,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "step failed, retrying"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                return StepRun { last, attempts, result: Err(EngineError::Cancelled) };
            }
            _ = tokio::time::sleep(delay) => {}
        }

        delay = next_delay(delay, factor);
    }
}

fn next_delay(delay: Duration, factor: f64) -> Duration {
    let nanos = delay.as_nanos() as f64 * factor;
    if nanos >= u64::MAX as f64 {
        Duration::MAX
    } else {
        Duration::from_nanos(nanos as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn failing(code: ErrorCode) -> ProxyResponse {
        ProxyResponse::failure("f", ProxyError::new(code, "nope"))
    }

    #[tokio::test]
    async fn test_no_policy_attempts_once() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let run = run_with_retry("s", None, &cancel, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(failing(ErrorCode::ServiceUnavailable)) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(run.attempts, 1);
        assert!(matches!(run.result, Err(EngineError::StepFailed { .. })));
        assert!(run.last.is_some());
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 1.0);
        let run = run_with_retry("s", Some(&policy), &cancel, |attempt| async move {
            if attempt < 3 {
                Ok(failing(ErrorCode::RateLimited))
            } else {
                Ok(ProxyResponse::ok("f", Default::default()))
            }
        })
        .await;

        assert_eq!(run.attempts, 3);
        assert!(run.result.is_ok());
        assert!(run.last.unwrap().success);
    }

    #[tokio::test]
    async fn test_exhausts_with_backoff() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy::new(2, Duration::from_millis(10), 2.0);
        let started = Instant::now();
        let run = run_with_retry("s", Some(&policy), &cancel, |_| async {
            Ok(failing(ErrorCode::ServiceUnavailable))
        })
        .await;

        assert_eq!(run.attempts, 3);
        assert!(started.elapsed() >= Duration::from_millis(30));
        match run.result {
            Err(EngineError::RetriesExhausted { attempts, last, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last.code, ErrorCode::ServiceUnavailable);
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_stops_early() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy::new(5, Duration::from_millis(1), 1.0);
        let run = run_with_retry("s", Some(&policy), &cancel, |_| async {
            Ok(failing(ErrorCode::InvalidPayload))
        })
        .await;

        assert_eq!(run.attempts, 1);
        assert!(matches!(run.result, Err(EngineError::StepFailed { .. })));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_backoff_wait() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy::new(3, Duration::from_secs(30), 1.0);
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let run = run_with_retry("s", Some(&policy), &cancel, |_| async {
            Ok(failing(ErrorCode::ServiceUnavailable))
        })
        .await;

        assert!(matches!(run.result, Err(EngineError::Cancelled)));
        assert_eq!(run.attempts, 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_next_delay_saturates() {
        assert_eq!(next_delay(Duration::from_millis(10), 2.0), Duration::from_millis(20));
        assert_eq!(next_delay(Duration::MAX, 2.0), Duration::MAX);
    }
}
