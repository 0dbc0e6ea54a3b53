//! Per-requester rate limiting for the credential endpoint.
//!
//! Fixed windows keyed by client IP. Expired windows are pruned once the
//! table grows past a threshold, and the table never holds more than
//! `max_tracked` requesters: a new requester arriving while it is full is
//! turned away until the oldest window expires.

use axum::http::HeaderMap;
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::{sync::Mutex, time::Instant};
use webshare_common::error::{WebshareError, WebshareResult};

const PRUNE_THRESHOLD: usize = 1024;

/// Default bound on distinct requesters tracked at once.
pub const DEFAULT_MAX_TRACKED: usize = 10_000;

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    max_tracked: usize,
    trust_forwarded_for: bool,
    inner: Arc<Mutex<HashMap<IpAddr, Window>>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            max_tracked: DEFAULT_MAX_TRACKED,
            trust_forwarded_for: false,
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `limit` requests per minute.
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Bound the number of requesters tracked at once.
    pub fn with_max_tracked(mut self, max_tracked: usize) -> Self {
        self.max_tracked = max_tracked.max(1);
        self
    }

    /// Identify requesters by the first `X-Forwarded-For` hop. Only safe behind a
    /// proxy that overwrites the header.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Who is asking: the socket peer, or the forwarded client address when
    /// forwarded headers are trusted and parseable.
    pub fn requester(&self, headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
        if self.trust_forwarded_for {
            if let Some(ip) = forwarded_for(headers) {
                return ip;
            }
        }
        peer.ip()
    }

    /// Count one request from `requester`, rejecting it once the window is full.
    pub async fn check(&self, requester: IpAddr) -> WebshareResult<()> {
        let now = Instant::now();
        let mut windows = self.inner.lock().await;

        if windows.len() > PRUNE_THRESHOLD.min(self.max_tracked.saturating_sub(1))
            && !windows.contains_key(&requester)
        {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        if windows.len() >= self.max_tracked && !windows.contains_key(&requester) {
            let oldest = windows
                .values()
                .map(|w| w.started)
                .min()
                .unwrap_or(now);
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            tracing::warn!(
                requester = %requester,
                tracked = windows.len(),
                "Rate limit table full, rejecting new requester"
            );
            return Err(WebshareError::RateLimited {
                retry_after_ms: retry_after.as_millis() as u64,
            });
        }

        let entry = windows.entry(requester).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.limit {
            let retry_after = self.window.saturating_sub(now.duration_since(entry.started));
            tracing::warn!(requester = %requester, "Credential request rate limited");
            return Err(WebshareError::RateLimited {
                retry_after_ms: retry_after.as_millis() as u64,
            });
        }

        entry.count += 1;
        Ok(())
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}
