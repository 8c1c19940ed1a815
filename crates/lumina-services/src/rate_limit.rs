//! Per-actor, per-action rate limiting
//!
//! Fixed windows keyed by `{actor}:{action}`, created lazily on first use
//! and rolled over once `now >= reset_at`. The map is sharded across several
//! mutexes to reduce contention, and a periodic sweep (started with
//! `spawn_cleanup`, plus a per-shard capacity bound) keeps memory bounded.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use uuid::Uuid;

const DEFAULT_SHARD_COUNT: usize = 16;
const MAX_WINDOWS_PER_SHARD: usize = 10_000;

/// Outcome of a rate-limit check. `reset_at` is surfaced to callers as a
/// retry-after hint when `allowed` is false.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: Instant,
}

impl RateLimitDecision {
    /// Seconds until the window resets, at least 1 for denied requests.
    pub fn retry_after_secs(&self) -> u64 {
        self.reset_at
            .saturating_duration_since(Instant::now())
            .as_secs()
            .max(1)
    }
}

#[derive(Clone)]
struct RateLimitWindow {
    count: u32,
    reset_at: Instant,
}

impl RateLimitWindow {
    fn new(window: Duration) -> Self {
        RateLimitWindow {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    /// Increment within the window, rolling it over first when expired.
    /// The count never exceeds `limit` while this returns allowed.
    fn check_and_increment(&mut self, limit: u32, window: Duration) -> (bool, u32) {
        let now = Instant::now();
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }
        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }
}

/// Sharded in-memory rate limiter.
#[derive(Clone)]
pub struct RateLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, RateLimitWindow>>>>,
    shard_count: usize,
    window: Duration,
    max_windows: usize,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self::with_shards(window, DEFAULT_SHARD_COUNT)
    }

    /// `shard_count` should be a power of two for even distribution.
    pub fn with_shards(window: Duration, shard_count: usize) -> Self {
        let shards = (0..shard_count)
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        RateLimiter {
            shards,
            shard_count,
            window,
            max_windows: MAX_WINDOWS_PER_SHARD,
        }
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shard_count
    }

    /// Check and consume one unit for `(actor, action)` against `limit`.
    pub async fn check(&self, actor_id: Uuid, action: &str, limit: u32) -> RateLimitDecision {
        let key = format!("{}:{}", actor_id, action);
        let shard = &self.shards[self.shard_index(&key)];
        let mut windows = shard.lock().await;

        if windows.len() >= self.max_windows {
            Self::evict(&mut windows, self.window);
        }

        let window_len = self.window;
        let window = windows
            .entry(key)
            .or_insert_with(|| RateLimitWindow::new(window_len));
        let (allowed, remaining) = window.check_and_increment(limit, window_len);
        let decision = RateLimitDecision {
            allowed,
            remaining,
            reset_at: window.reset_at,
        };
        if !allowed {
            tracing::warn!(
                actor_id = %actor_id,
                action = %action,
                limit,
                retry_after_secs = decision.retry_after_secs(),
                "Rate limit exceeded"
            );
        }
        decision
    }

    /// Spawn the background sweep that runs `cleanup_expired_windows` every
    /// `period`. The task holds a clone sharing the same shards and runs
    /// until the returned handle is aborted or the runtime shuts down.
    pub fn spawn_cleanup(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; skip it so the first
            // sweep happens one full period after startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.cleanup_expired_windows().await;
            }
        })
    }

    /// Remove expired windows across all shards to bound memory. Runs on the
    /// timer started by `spawn_cleanup`.
    pub async fn cleanup_expired_windows(&self) {
        let now = Instant::now();
        let grace = self.window;
        let mut total_cleaned = 0;
        for shard in &self.shards {
            let mut windows = shard.lock().await;
            let before = windows.len();
            windows.retain(|_, w| w.reset_at > now || now - w.reset_at < grace);
            total_cleaned += before - windows.len();
        }
        if total_cleaned > 0 {
            tracing::debug!(
                windows_cleaned = total_cleaned,
                "Cleaned up expired rate limit windows"
            );
        }
    }

    /// Number of tracked windows across all shards; used by tests.
    pub async fn window_count(&self) -> usize {
        let mut count = 0;
        for shard in &self.shards {
            count += shard.lock().await.len();
        }
        count
    }

    fn evict(windows: &mut HashMap<String, RateLimitWindow>, grace: Duration) {
        let now = Instant::now();
        windows.retain(|_, w| w.reset_at > now || now - w.reset_at < grace);
        // Still at capacity: drop the window closest to expiry.
        if windows.len() >= MAX_WINDOWS_PER_SHARD {
            if let Some(oldest) = windows
                .iter()
                .min_by_key(|(_, w)| w.reset_at)
                .map(|(k, _)| k.clone())
            {
                windows.remove(&oldest);
                tracing::debug!(removed_key = %oldest, "Evicted rate limit window at capacity");
            }
        }
    }
}
