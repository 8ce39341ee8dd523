//! Fixed-window rate limiting per endpoint and client IP.
//!
//! Each `(endpoint path, client IP)` pair gets a counter that lives for one
//! window (60 seconds by default). The first call opens the window; every
//! later call in the same window bumps the count, and calls past the limit
//! are denied until the window elapses.
//!
//! Being a fixed window, a client can spend its full allowance at the end of
//! one window and again at the start of the next, so bursts around a
//! boundary can reach twice the nominal rate.

use dashmap::DashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Denied { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    endpoint: String,
    client_ip: IpAddr,
}

/// Counter for one window.
#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    window_start: Instant,
    count: u64,
}

/// Shared window table. Cheap to check from many request tasks at once:
/// each key's read-modify-write happens under that key's map entry guard,
/// so two concurrent requests from the same client never observe the same
/// count.
pub struct RateLimiter {
    window: Duration,
    windows: DashMap<WindowKey, RateLimitWindow>,
}

impl RateLimiter {
    /// Create a limiter with the standard one-minute window.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Create a limiter with a custom window length.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero.
    pub fn with_window(window: Duration) -> Self {
        assert!(!window.is_zero(), "Window must be non-zero");
        Self {
            window,
            windows: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a call to `endpoint` from `client_ip` now.
    pub fn check(&self, endpoint: &str, client_ip: IpAddr, limit: u32) -> RateDecision {
        self.check_at(endpoint, client_ip, limit, Instant::now())
    }

    /// Record a call at `now`.
    pub fn check_at(
        &self,
        endpoint: &str,
        client_ip: IpAddr,
        limit: u32,
        now: Instant,
    ) -> RateDecision {
        let key = WindowKey {
            endpoint: endpoint.to_string(),
            client_ip,
        };

        let mut entry = self.windows.entry(key).or_insert(RateLimitWindow {
            window_start: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.window_start);
        if entry.count == 0 || elapsed >= self.window {
            entry.window_start = now;
            entry.count = 1;
            return RateDecision::Allowed {
                remaining: limit.saturating_sub(1),
            };
        }

        // Keeps counting past the limit; the denial holds until the window ends.
        entry.count = entry.count.saturating_add(1);
        if entry.count <= u64::from(limit) {
            RateDecision::Allowed {
                remaining: limit - entry.count as u32,
            }
        } else {
            RateDecision::Denied {
                retry_after: self.window - elapsed,
            }
        }
    }

    /// Drop every window that has already elapsed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Drop every window elapsed as of `now`. An elapsed window behaves
    /// exactly like a missing one, so this never changes a decision.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.window_start) < self.window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
