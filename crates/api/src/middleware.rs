// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Middleware module for HTTP request processing
//!
//! Per-client fixed-window rate limiting of the classification endpoint.
//!
//! Each client gets a record `{count, window_reset_at}`. A request is admitted
//! when the client has no record or its window has passed (`now > reset`), which
//! starts a fresh window with a count of one. Otherwise it is admitted only while
//! `count < max_requests`. The Nth request in a window is admitted and the N+1th
//! denied. Records live in a sharded concurrent map and are updated through the
//! entry API, so concurrent requests from one client cannot overshoot the limit.

use std::{
    fmt,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::{config::RateLimitingConfig, error::ServerError, metrics};

/// Key used when a client cannot be identified
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Opaque identifier of a rate-limited client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Create a key from any identifier
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive the key for a request
    ///
    /// Uses the first entry of `X-Forwarded-For`, then the peer address, then
    /// [`UNKNOWN_CLIENT`].
    pub fn from_request_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match (forwarded, peer) {
            (Some(forwarded), _) => Self::new(forwarded),
            (None, Some(peer)) => Self::new(peer.ip().to_string()),
            (None, None) => Self::new(UNKNOWN_CLIENT),
        }
    }

    /// Key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request count of one client within its current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Admitted requests in the current window
    pub count: u32,
    /// Instant after which the window may be reset
    pub window_reset_at: Instant,
}

/// Decision for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request may proceed
    Admitted,
    /// Request is rejected until the window resets
    Denied {
        /// Time left in the client's window
        retry_after: Duration,
    },
}

impl Admission {
    /// Whether the request may proceed
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Rate limiting middleware state
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitingConfig,
    records: Arc<DashMap<ClientKey, RateLimitRecord>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration
    pub fn new(config: RateLimitingConfig) -> Self {
        Self {
            config,
            records: Arc::new(DashMap::new()),
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Number of tracked clients
    pub fn tracked_clients(&self) -> usize {
        self.records.len()
    }

    /// Current record of a client
    pub fn record(&self, key: &ClientKey) -> Option<RateLimitRecord> {
        self.records.get(key).map(|record| *record)
    }

    /// Decide whether a request from `key` at `now` is admitted
    pub fn admit(&self, key: &ClientKey, now: Instant) -> bool {
        self.check(key, now).is_admitted()
    }

    /// Decide whether a request from `key` at `now` is admitted, with the
    /// remaining window on denial
    pub fn check(&self, key: &ClientKey, now: Instant) -> Admission {
        if !self.config.enabled {
            return Admission::Admitted;
        }

        if self.records.len() > self.config.max_tracked_clients {
            self.cleanup_expired_entries(now);
        }

        let limit = self.config.max_requests.value();
        let window = self.config.window_ms.value();

        let mut record = self
            .records
            .entry(key.clone())
            .or_insert_with(|| RateLimitRecord {
                count: 0,
                window_reset_at: now + window,
            });

        if record.count == 0 || now > record.window_reset_at {
            record.count = 1;
            record.window_reset_at = now + window;
            return Admission::Admitted;
        }

        if record.count >= limit {
            let retry_after = record.window_reset_at.saturating_duration_since(now);
            debug!(client = %key, count = record.count, "rate limit reached");
            return Admission::Denied { retry_after };
        }

        record.count += 1;
        Admission::Admitted
    }

    /// Sweep expired records, then evict the oldest windows if still over the bound
    fn cleanup_expired_entries(&self, now: Instant) {
        let entries_before = self.records.len();

        self.records.retain(|_, record| now <= record.window_reset_at);

        let entries_after = self.records.len();
        let cleaned_up = entries_before.saturating_sub(entries_after);

        if cleaned_up > 0 {
            debug!("cleaned up {} expired rate limiter entries", cleaned_up);
        }

        let bound = self.config.max_tracked_clients;
        if entries_after > bound {
            warn!(
                "rate limiter still has {} entries after cleanup, removing oldest",
                entries_after
            );

            let mut oldest_entries: Vec<_> = self
                .records
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().window_reset_at))
                .collect();

            oldest_entries.sort_by_key(|(_, reset_at)| *reset_at);

            let entries_to_remove = entries_after - bound / 2;
            for (key, _) in oldest_entries.into_iter().take(entries_to_remove) {
                self.records.remove(&key);
            }
        }
    }
}

/// Rate limiting middleware function
pub async fn rate_limiting_middleware(
    State(rate_limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = ClientKey::from_request_parts(req.headers(), peer);

    match rate_limiter.check(&key, Instant::now()) {
        Admission::Admitted => next.run(req).await,
        Admission::Denied { retry_after } => {
            metrics::RATE_LIMIT_DENIALS.inc();
            warn!(client = %key, "rate limit exceeded");

            // Rounded up to whole seconds
            let retry_after_seconds =
                retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            ServerError::RateLimited {
                retry_after_seconds,
            }
            .into_response()
        }
    }
}
