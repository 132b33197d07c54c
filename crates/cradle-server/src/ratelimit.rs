use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{error::ApiError, AppState};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Buckets are swept for expired windows once the map grows past this.
const PRUNE_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter per client key.
#[derive(Clone)]
pub struct RateLimiter {
    window: Duration,
    max: u32,
    buckets: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window,
            max,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if buckets.len() >= PRUNE_THRESHOLD {
            let window = self.window;
            buckets.retain(|_, w| now.saturating_duration_since(w.started) < window);
        }

        let entry = buckets.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max {
            return Decision::Limited {
                retry_after: self.window.saturating_sub(now.saturating_duration_since(entry.started)),
            };
        }
        entry.count += 1;
        Decision::Allowed {
            remaining: self.max - entry.count,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_REQUESTS)
    }
}

/// Identifies the caller: socket peer address, else the first
/// `X-Forwarded-For` hop, else a shared bucket.
pub fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Axum middleware applying the shared [`RateLimiter`] to every API route.
pub async fn limit_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(&request);
    match state.limiter.check(&key) {
        Decision::Allowed { .. } => next.run(request).await,
        Decision::Limited { retry_after } => {
            warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
            ApiError::TooManyRequests { retry_after }.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_then_limits() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        let t0 = Instant::now();
        assert_eq!(limiter.check_at("a", t0), Decision::Allowed { remaining: 2 });
        assert_eq!(limiter.check_at("a", t0), Decision::Allowed { remaining: 1 });
        assert_eq!(limiter.check_at("a", t0), Decision::Allowed { remaining: 0 });
        assert_eq!(
            limiter.check_at("a", t0 + Duration::from_secs(20)),
            Decision::Limited {
                retry_after: Duration::from_secs(40)
            }
        );
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let t0 = Instant::now();
        assert!(matches!(limiter.check_at("a", t0), Decision::Allowed { .. }));
        assert!(matches!(limiter.check_at("b", t0), Decision::Allowed { .. }));
        assert!(matches!(limiter.check_at("a", t0), Decision::Limited { .. }));
    }

    #[test]
    fn window_resets() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let t0 = Instant::now();
        limiter.check_at("a", t0);
        assert!(matches!(limiter.check_at("a", t0), Decision::Limited { .. }));
        assert!(matches!(
            limiter.check_at("a", t0 + Duration::from_secs(60)),
            Decision::Allowed { .. }
        ));
    }

    #[test]
    fn forwarded_for_is_used_without_peer_address() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "203.0.113.7");

        let bare = Request::builder().body(axum::body::Body::empty()).unwrap();
        assert_eq!(client_key(&bare), "unknown");
    }
}
