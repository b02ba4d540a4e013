//! Fixed-window per-client request limiter for the chat route.

use dashmap::DashMap;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

struct Window {
    started: Instant,
    count: u32,
}

/// Counts requests per client key in fixed one-minute windows. A zero
/// budget disables limiting entirely. Shared across requests behind an
/// `Arc`; the map shards its own locking.
pub struct RateLimiter {
    max_per_window: u32,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(max_per_window: u32) -> Self {
        Self {
            max_per_window,
            windows: DashMap::new(),
        }
    }

    /// Records one request for `key` and reports whether it fits the
    /// current window's budget.
    pub fn try_acquire(&self, key: &str) -> bool {
        self.try_acquire_at(key, Instant::now())
    }

    fn try_acquire_at(&self, key: &str, now: Instant) -> bool {
        if self.max_per_window == 0 {
            return true;
        }
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= WINDOW {
            entry.started = now;
            entry.count = 0;
        }
        if entry.count >= self.max_per_window {
            false
        } else {
            entry.count += 1;
            true
        }
    }
}
