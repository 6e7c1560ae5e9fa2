use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderValue},
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::sync::RwLock;
use tracing::debug;

/// How far back window entries are kept during the periodic sweep.
/// Must be at least as long as the longest configured interval.
const SWEEP_RETENTION: Duration = Duration::from_secs(600);

/// How often the full store sweep runs (piggybacked on a check, no background task).
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Rate limiting configuration for one route class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum number of requests per window
    pub max_requests: u32,
    /// Sliding window duration
    pub interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests: 300, interval: Duration::from_secs(60) }
    }
}

/// Route classes with distinct rate limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitTier {
    /// Login/signup/token endpoints - strict limits
    Auth,
    /// General API endpoints - moderate limits
    Api,
    /// Everything else (page reads) - generous limits
    Default,
}

impl RateLimitTier {
    /// Select the tier for a request path, in priority order: auth segments
    /// first, then the API prefix, then the default read tier.
    pub fn for_path(path: &str) -> Self {
        if path.contains("/auth") {
            RateLimitTier::Auth
        } else if path.starts_with("/api") {
            RateLimitTier::Api
        } else {
            RateLimitTier::Default
        }
    }

    pub fn to_config(self) -> RateLimitConfig {
        match self {
            RateLimitTier::Auth => {
                RateLimitConfig { max_requests: 10, interval: Duration::from_secs(60) }
            }
            RateLimitTier::Api => {
                RateLimitConfig { max_requests: 100, interval: Duration::from_secs(60) }
            }
            RateLimitTier::Default => {
                RateLimitConfig { max_requests: 300, interval: Duration::from_secs(60) }
            }
        }
    }
}

/// Outcome of a single limiter check.
///
/// Computed fresh on every call and reused for both the admission decision and
/// the telemetry headers, so the reported `remaining` always matches what the
/// gate saw.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub limited: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    pub fn add_headers(&self, headers: &mut HeaderMap) {
        if let Ok(limit) = HeaderValue::from_str(&self.limit.to_string()) {
            headers.insert("x-ratelimit-limit", limit);
        }
        if let Ok(remaining) = HeaderValue::from_str(&self.remaining.to_string()) {
            headers.insert("x-ratelimit-remaining", remaining);
        }
        if let Ok(reset) = HeaderValue::from_str(&self.reset_at.timestamp().to_string()) {
            headers.insert("x-ratelimit-reset", reset);
        }
    }
}

#[derive(Debug, Default)]
struct WindowStore {
    /// Client identity -> epoch-millisecond request timestamps
    windows: HashMap<String, Vec<i64>>,
    last_sweep_ms: i64,
}

/// Sliding-window-log rate limiter shared across concurrent requests.
///
/// Expiry is lazy: each check filters the client's window before counting.
/// A full-store sweep runs at most once per [`SWEEP_INTERVAL`], dropping idle
/// clients so the map stays bounded under high client cardinality. The limiter
/// is soft: two concurrent checks for the same client may both observe a stale
/// count and both be admitted.
#[derive(Debug, Clone, Default)]
pub struct SlidingWindowLimiter {
    store: Arc<RwLock<WindowStore>>,
}

impl SlidingWindowLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `client` is over the limit for `config`.
    ///
    /// The stored window is mutated only on the admitted path: a limited
    /// request does not count toward future windows.
    pub async fn check(&self, client: &str, config: &RateLimitConfig) -> RateLimitDecision {
        let now = Utc::now();
        let now_ms = now.timestamp_millis();
        let interval_ms = i64::try_from(config.interval.as_millis()).unwrap_or(i64::MAX);
        let window_start = now_ms - interval_ms;

        let mut store = self.store.write().await;

        let hits = store.windows.entry(client.to_string()).or_default();
        hits.retain(|&t| t > window_start);

        let count = hits.len() as u32;
        let limited = count >= config.max_requests;
        if !limited {
            hits.push(now_ms);
        }

        debug!(client, count, limited, "rate limit check");

        let retention_cutoff = now_ms - i64::try_from(SWEEP_RETENTION.as_millis()).unwrap_or(0);
        let sweep_due = now_ms - store.last_sweep_ms
            > i64::try_from(SWEEP_INTERVAL.as_millis()).unwrap_or(i64::MAX);
        if sweep_due {
            store.last_sweep_ms = now_ms;
            store.windows.retain(|_, hits| {
                hits.retain(|&t| t > retention_cutoff);
                !hits.is_empty()
            });
        }

        let remaining =
            if limited { 0 } else { config.max_requests.saturating_sub(count + 1) };

        RateLimitDecision {
            limited,
            limit: config.max_requests,
            remaining,
            reset_at: now + ChronoDuration::milliseconds(interval_ms),
        }
    }

    /// Number of clients currently tracked (test/observability hook)
    pub async fn tracked_clients(&self) -> usize {
        self.store.read().await.windows.len()
    }
}

/// Derive the rate-limit key for a request: `{source_ip}:{user_agent}`.
///
/// The source IP prefers `x-forwarded-for` (first entry), then `x-real-ip`,
/// then connection info. A missing user agent becomes `"unknown"`.
pub fn client_identity(request: &Request) -> String {
    let ip = extract_client_ip(request);
    let user_agent =
        request.headers().get("user-agent").and_then(|v| v.to_str().ok()).unwrap_or("unknown");
    format!("{ip}:{user_agent}")
}

fn extract_client_ip(request: &Request) -> IpAddr {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // First entry is the originating client
            if let Some(first_ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            if let Ok(ip) = ip_str.parse::<IpAddr>() {
                return ip;
            }
        }
    }

    if let Some(ConnectInfo(socket_addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return socket_addr.ip();
    }

    IpAddr::from([127, 0, 0, 1])
}
