//! Fixed-window request limiter keyed by client address.
//!
//! State lives in this process only; several instances behind a balancer each
//! count on their own.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::config::RateLimitConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[cfg(test)]
impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    hits: u32,
}

pub struct FixedWindowLimiter {
    window: Duration,
    max_requests: u32,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_secs(config.window_secs), config.max_requests)
    }

    /// Counts one hit for `key`. The window opens on the first hit and resets
    /// once `now` reaches its end.
    pub fn check(&self, key: &str, now: Instant) -> RateDecision {
        let mut windows = self.windows.lock();
        let entry = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            hits: 0,
        });

        if now.saturating_duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.hits = 0;
        }

        if entry.hits >= self.max_requests {
            let retry_after = (entry.started_at + self.window).saturating_duration_since(now);
            return RateDecision::Limited { retry_after };
        }

        entry.hits += 1;
        RateDecision::Allowed {
            remaining: self.max_requests - entry.hits,
        }
    }

    /// Drops windows that have expired. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, w| now.saturating_duration_since(w.started_at) < self.window);
        let removed = before - windows.len();
        if removed > 0 {
            debug!(removed, remaining = windows.len(), "swept rate limit windows");
        }
        removed
    }

    #[cfg(test)]
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}
