//! Sliding-window rate limiter for expensive API routes
//!
//! Keeps the timestamps of recently admitted requests and rejects new ones
//! once the window is full. Callers are never queued.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default budget for the coin analysis route
pub const ANALYSIS_REQUESTS_PER_MINUTE: usize = 10;

/// Rate limiter that admits at most `max_requests` per `window`
#[derive(Debug)]
pub struct RateLimiter {
    /// Admission times still inside the window, oldest first
    admitted: Mutex<VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
    /// Name for logging purposes
    name: String,
    total_requests: AtomicU64,
    rejected_requests: AtomicU64,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration, name: &str) -> Self {
        Self {
            admitted: Mutex::new(VecDeque::with_capacity(max_requests)),
            max_requests,
            window,
            name: name.to_string(),
            total_requests: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
        }
    }

    /// `max_requests` per rolling minute
    pub fn per_minute(max_requests: usize, name: &str) -> Self {
        Self::new(max_requests, Duration::from_secs(60), name)
    }

    /// Try to admit a request now. Returns `false` when the window is full.
    pub async fn try_acquire(&self) -> bool {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();

        let mut admitted = self.admitted.lock().await;
        evict_expired(&mut admitted, now, self.window);

        if admitted.len() >= self.max_requests {
            self.rejected_requests.fetch_add(1, Ordering::Relaxed);
            warn!(
                "[RATE_LIMITER:{}] rejected, {} requests in the last {:?}",
                self.name,
                admitted.len(),
                self.window
            );
            return false;
        }

        admitted.push_back(now);
        debug!(
            "[RATE_LIMITER:{}] admitted ({}/{})",
            self.name,
            admitted.len(),
            self.max_requests
        );
        true
    }

    /// How many more requests would be admitted right now
    pub async fn remaining(&self) -> usize {
        let mut admitted = self.admitted.lock().await;
        evict_expired(&mut admitted, Instant::now(), self.window);
        self.max_requests.saturating_sub(admitted.len())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Get statistics about this rate limiter (for debugging)
    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
            max_requests: self.max_requests,
            window_secs: self.window.as_secs(),
            name: self.name.clone(),
        }
    }
}

fn evict_expired(admitted: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = admitted.front() {
        if now.duration_since(*oldest) >= window {
            admitted.pop_front();
        } else {
            break;
        }
    }
}

/// Statistics about rate limiter usage
#[derive(Debug, Clone, Serialize)]
pub struct RateLimiterStats {
    pub total_requests: u64,
    pub rejected_requests: u64,
    pub max_requests: usize,
    pub window_secs: u64,
    pub name: String,
}
