//! Per-caller fixed-window rate limiter.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Windows idle for this many window lengths are evicted.
const IDLE_WINDOWS_BEFORE_EVICTION: u32 = 5;

/// Request count for one caller within the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub window_start: Instant,
}

impl RateWindow {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateDecision {
    Allowed,
    Denied,
}

impl RateDecision {
    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }
}

/// Fixed-window limiter keyed by caller identity.
///
/// Each caller's window lives in one map entry and is updated under that
/// entry's shard lock, so concurrent requests from the same caller cannot be
/// admitted past the limit while unrelated callers on other shards proceed
/// in parallel.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    windows: DashMap<String, RateWindow>,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Admit or deny one request from `caller_id`, consuming budget on admission.
    pub fn check_and_consume(&self, caller_id: &str) -> RateDecision {
        self.check_and_consume_at(caller_id, Instant::now())
    }

    pub fn check_and_consume_at(&self, caller_id: &str, now: Instant) -> RateDecision {
        let mut window = match self.windows.entry(caller_id.to_string()) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => entry.insert(RateWindow::new(now)),
        };

        if now.saturating_duration_since(window.window_start) > self.window {
            window.count = 0;
            window.window_start = now;
        }

        if window.count >= self.max_requests {
            warn!(
                caller = caller_id,
                "Rate limit exceeded: {}/{}", window.count, self.max_requests
            );
            return RateDecision::Denied;
        }

        window.count += 1;
        debug!(
            caller = caller_id,
            "Rate limit permit acquired: {}/{}", window.count, self.max_requests
        );
        RateDecision::Allowed
    }

    /// Remaining budget for a caller without consuming any.
    pub fn status(&self, caller_id: &str) -> RateLimitStatus {
        self.status_at(caller_id, Instant::now())
    }

    pub fn status_at(&self, caller_id: &str, now: Instant) -> RateLimitStatus {
        let used = self
            .windows
            .get(caller_id)
            .filter(|w| now.saturating_duration_since(w.window_start) <= self.window)
            .map_or(0, |w| w.count);

        RateLimitStatus {
            used,
            remaining: self.max_requests.saturating_sub(used),
            max_requests: self.max_requests,
            window_ms: self.window.as_millis() as u64,
        }
    }

    /// Drop windows that have been idle for several window lengths.
    ///
    /// An evicted caller starts over with a fresh window, which is what the
    /// reset rule would have done anyway.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let idle_after = self.window * IDLE_WINDOWS_BEFORE_EVICTION;
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.window_start) <= idle_after);
        let evicted = before.saturating_sub(self.windows.len());
        if evicted > 0 {
            info!("Evicted {} idle rate-limit windows", evicted);
        }
        evicted
    }

    /// Run [`evict_idle`](Self::evict_idle) at most once per window length.
    pub fn maybe_evict(&self, now: Instant) -> usize {
        {
            let mut last_sweep = self.last_sweep.lock();
            if now.saturating_duration_since(*last_sweep) < self.window {
                return 0;
            }
            *last_sweep = now;
        }
        self.evict_idle(now)
    }

    /// Number of callers currently tracked.
    pub fn tracked_callers(&self) -> usize {
        self.windows.len()
    }
}

/// Rate limiter status for one caller.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub used: u32,
    pub remaining: u32,
    pub max_requests: u32,
    pub window_ms: u64,
}

/// Rate limiter builder.
pub struct RateLimiterBuilder {
    window: Duration,
    max_requests: u32,
}

impl Default for RateLimiterBuilder {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 10,
        }
    }
}

impl RateLimiterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn max_requests(mut self, max: u32) -> Self {
        self.max_requests = max;
        self
    }

    pub fn build(self) -> RateLimiter {
        RateLimiter::new(self.window, self.max_requests)
    }
}
