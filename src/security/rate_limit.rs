//! Per-client sliding window rate limiting.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Request timestamps of one client inside the trailing window.
#[derive(Debug, Default)]
struct RequestWindow {
    timestamps: VecDeque<Instant>,
}

impl RequestWindow {
    /// Drop timestamps that fell out of the window.
    fn purge(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.duration_since(oldest) >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Sliding window limiter keyed by client address.
#[derive(Debug)]
pub struct SlidingWindowRateLimiter {
    windows: DashMap<String, RequestWindow>,
    limit: usize,
    window: Duration,
}

impl SlidingWindowRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_params(config.max_requests, config.window())
    }

    pub fn with_params(limit: usize, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    /// Record a request from `client` if it is within the limit.
    ///
    /// A rejected request is not recorded.
    pub fn allow(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.windows.entry(client.to_string()).or_default();
        let window = entry.value_mut();
        window.purge(now, self.window);

        if window.timestamps.len() >= self.limit {
            drop(entry);
            tracing::warn!(client = %client, limit = self.limit, "Rate limit exceeded");
            metrics::record_rate_limited();
            return false;
        }

        window.timestamps.push_back(now);
        true
    }

    /// Purge expired timestamps for every client and drop empty windows.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            window.purge(now, self.window);
            !window.timestamps.is_empty()
        });
        let removed = before.saturating_sub(self.windows.len());
        metrics::record_rate_limiter_clients(self.windows.len());
        removed
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Run the periodic sweep until shutdown.
    pub async fn run_sweeper(
        self: Arc<Self>,
        every: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep();
                    let tracked = self.tracked_clients();
                    tracing::debug!(removed, tracked, "Rate limiter sweep");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limiter sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
