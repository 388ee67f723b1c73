//! Process-wide rate limiting for external service calls
//!
//! One limiter per channel (`llm`, `embedding`, `reranker`, `translator`),
//! shared across the process through a named registry. Each channel composes
//! two policies: a minimum inter-call interval and a sliding window of at
//! most N calls per time unit. A single mutex per channel serializes the
//! check-and-wait, so concurrent callers queue up in order; the async path
//! holds the lock across a cooperative sleep, the blocking path across a
//! thread sleep.

use crate::config::RateLimitConfig;
use lazy_static::lazy_static;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

lazy_static! {
    static ref CHANNELS: RwLock<HashMap<String, Arc<RateLimiter>>> = RwLock::new(HashMap::new());
}

struct ChannelState {
    last_call: Option<Instant>,
    recent: VecDeque<Instant>,
}

/// Rate limiter for one service channel
pub struct RateLimiter {
    policy: RateLimitConfig,
    state: tokio::sync::Mutex<ChannelState>,
}

impl RateLimiter {
    /// Create a limiter with the given policy
    pub fn new(policy: RateLimitConfig) -> Self {
        Self {
            policy,
            state: tokio::sync::Mutex::new(ChannelState {
                last_call: None,
                recent: VecDeque::new(),
            }),
        }
    }

    /// The policy this limiter enforces
    pub fn policy(&self) -> &RateLimitConfig {
        &self.policy
    }

    /// Wait until a call is permitted, then record it.
    ///
    /// The channel mutex is held across the sleep so waiting callers are
    /// served in lock-acquisition order.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        let wait = self.required_wait(&mut state);
        if wait > Duration::ZERO {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limiter sleeping");
            tokio::time::sleep(wait).await;
        }
        self.record_call(&mut state);
    }

    /// Blocking variant for synchronous call sites.
    ///
    /// Must not be called from inside an async task.
    pub fn acquire_blocking(&self) {
        let mut state = self.state.blocking_lock();
        let wait = self.required_wait(&mut state);
        if wait > Duration::ZERO {
            std::thread::sleep(wait);
        }
        self.record_call(&mut state);
    }

    fn required_wait(&self, state: &mut ChannelState) -> Duration {
        let now = Instant::now();
        let mut wait = Duration::ZERO;

        let min_interval = Duration::from_secs_f64(self.policy.min_interval_seconds);
        if let Some(last) = state.last_call {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < min_interval {
                wait = min_interval - elapsed;
            }
        }

        let window = Duration::from_secs(self.policy.time_unit.seconds());
        while let Some(&front) = state.recent.front() {
            if front + window <= now {
                state.recent.pop_front();
            } else {
                break;
            }
        }
        if state.recent.len() >= self.policy.rate_limit as usize {
            if let Some(&front) = state.recent.front() {
                let until_expiry = (front + window).saturating_duration_since(now);
                if until_expiry > wait {
                    wait = until_expiry;
                }
            }
        }

        wait
    }

    fn record_call(&self, state: &mut ChannelState) {
        let now = Instant::now();
        state.last_call = Some(now);
        state.recent.push_back(now);
        // Bounded FIFO: at most rate_limit entries.
        while state.recent.len() > self.policy.rate_limit as usize {
            state.recent.pop_front();
        }
    }
}

/// Install a policy for a named channel, replacing any existing limiter
pub fn configure_channel(name: &str, policy: RateLimitConfig) -> Arc<RateLimiter> {
    let limiter = Arc::new(RateLimiter::new(policy));
    CHANNELS
        .write()
        .expect("rate limiter registry poisoned")
        .insert(name.to_string(), Arc::clone(&limiter));
    limiter
}

/// Fetch the limiter for a named channel, creating one with the default
/// policy on first use
pub fn channel(name: &str) -> Arc<RateLimiter> {
    if let Some(limiter) = CHANNELS
        .read()
        .expect("rate limiter registry poisoned")
        .get(name)
    {
        return Arc::clone(limiter);
    }
    configure_channel(name, RateLimitConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeUnit;

    fn window_policy(rate_limit: u32) -> RateLimitConfig {
        RateLimitConfig {
            rate_limit,
            time_unit: TimeUnit::Second,
            min_interval_seconds: 0.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sliding_window_bounds_throughput() {
        // 2 calls per second; 5 back-to-back calls must take >= 2s total.
        let limiter = RateLimiter::new(window_policy(2));
        let start = Instant::now();
        let mut stamps = Vec::new();
        for _ in 0..5 {
            limiter.acquire().await;
            stamps.push(Instant::now());
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2), "elapsed {:?}", elapsed);

        // No sliding 1s window contains more than 2 completed calls.
        for (i, &stamp) in stamps.iter().enumerate() {
            let in_window = stamps[i..]
                .iter()
                .filter(|&&s| s.saturating_duration_since(stamp) < Duration::from_secs(1))
                .count();
            assert!(in_window <= 2, "window starting at call {} holds {}", i, in_window);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn min_interval_spaces_calls() {
        let limiter = RateLimiter::new(RateLimitConfig {
            rate_limit: 1000,
            time_unit: TimeUnit::Second,
            min_interval_seconds: 0.5,
        });
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs_f64(1.0));
    }

    #[tokio::test]
    async fn registry_returns_same_channel() {
        let a = channel("test-registry-channel");
        let b = channel("test-registry-channel");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
