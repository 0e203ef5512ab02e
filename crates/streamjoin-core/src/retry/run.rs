//! Retry loop: run an attempt future until success or the policy says stop.

use std::future::Future;
use std::time::Duration;

use super::classify;
use super::error::{FetchError, RetryError};
use super::policy::{RetryDecision, RetryPolicy};
use super::state::ChunkState;

/// Runs `attempt` until it succeeds or the retry policy says to stop,
/// driving `state` through its transitions.
///
/// `attempt` receives the 1-based attempt number (used for the growing
/// per-attempt timeout) and resolves to the number of bytes written.
/// Between attempts the loop awaits `sleep(delay)`; production code passes
/// `tokio::time::sleep`, tests pass a recorder.
pub async fn run_with_retry<A, AF, S, SF>(
    policy: &RetryPolicy,
    state: &mut ChunkState,
    mut sleep: S,
    mut attempt: A,
) -> Result<u64, RetryError>
where
    A: FnMut(u32) -> AF,
    AF: Future<Output = Result<u64, FetchError>>,
    S: FnMut(Duration) -> SF,
    SF: Future<Output = ()>,
{
    loop {
        let n = state.begin_attempt();
        match attempt(n).await {
            Ok(bytes) => {
                state.complete(bytes);
                return Ok(bytes);
            }
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(n, kind) {
                    RetryDecision::NoRetry => {
                        state.fail();
                        if kind.is_retryable() {
                            tracing::warn!(chunk = state.index, attempts = n, error = %e, "chunk retries exhausted");
                            return Err(RetryError::Exhausted {
                                attempts: n,
                                last: e,
                            });
                        }
                        return Err(RetryError::Fatal(e));
                    }
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(
                            chunk = state.index,
                            attempt = n,
                            delay_ms = d.as_millis() as u64,
                            error = %e,
                            "chunk attempt failed, retrying"
                        );
                        state.schedule_retry(d);
                        sleep(d).await;
                    }
                }
            }
        }
    }
}
