//! Bounded-concurrency fan-out with retries
//!
//! `gather_with_limit` runs a list of work-unit factories with a concurrency
//! cap and per-unit exponential-backoff retries, returning one slot per unit
//! (`None` on permanent failure — a failed unit never fails the batch).
//! `with_retries` is the retry half alone, for single calls that should
//! surface their final error.

use crate::error::Result;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;

/// Retry an operation with exponential backoff (`delay * 2^attempt`).
///
/// The final failure is returned to the caller.
pub async fn with_retries<T, F, Fut>(mut op: F, max_retries: u32, retry_delay: Duration) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = max_retries.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= attempts {
                    return Err(e);
                }
                let delay = retry_delay * 2u32.saturating_pow(attempt - 1);
                tracing::warn!(
                    attempt,
                    max = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Run factories with a concurrency limit; results come back in input order.
///
/// Each unit is retried up to `max_retries` times with exponential backoff;
/// a unit that fails permanently yields `None` in its slot.
pub async fn gather_with_limit<T, F, Fut>(
    factories: Vec<F>,
    limit: usize,
    max_retries: u32,
    retry_delay: Duration,
) -> Vec<Option<T>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let limit = limit.max(1);
    let total = factories.len();

    let mut results: Vec<(usize, Option<T>)> = stream::iter(factories.into_iter().enumerate())
        .map(|(index, factory)| async move {
            let outcome = with_retries(&factory, max_retries, retry_delay).await;
            match outcome {
                Ok(value) => (index, Some(value)),
                Err(e) => {
                    tracing::warn!(unit = index, total, error = %e, "unit failed permanently");
                    (index, None)
                }
            }
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, value)| value).collect()
}
