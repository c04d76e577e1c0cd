//! Fixed-window rate limiting for the public auth routes, keyed by client IP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;

use crate::error::AppError;

/// Rate limiter that tracks requests per client key.
#[derive(Debug)]
pub struct RateLimiter {
    /// key -> (request count, window start)
    requests: RwLock<HashMap<String, (u32, Instant)>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// `Ok(remaining)` when allowed, `Err(retry_after_secs)` when the window is exhausted.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, u64> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let entry = requests.entry(key.to_string()).or_insert((0, now));

        if now.duration_since(entry.1) >= self.window {
            *entry = (1, now);
            return Ok(self.max_requests.saturating_sub(1));
        }

        if entry.0 >= self.max_requests {
            let elapsed = now.duration_since(entry.1).as_secs();
            return Err(self.window.as_secs().saturating_sub(elapsed).max(1));
        }

        entry.0 += 1;
        Ok(self.max_requests.saturating_sub(entry.0))
    }

    /// Drop windows that have ended.
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        self.requests
            .write()
            .await
            .retain(|_, (_, start)| now.duration_since(*start) < self.window);
    }

    /// Periodically prune expired windows until the process exits.
    pub fn spawn_cleanup(self: &Arc<Self>) {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.window);
            loop {
                ticker.tick().await;
                limiter.cleanup_expired().await;
            }
        });
    }
}

/// Rate limiting middleware. Exhausted clients get 429 with `Retry-After`.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);

    match limiter.check_rate_limit(&key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limiter.max_requests));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
            response
        }
        Err(retry_after) => {
            tracing::warn!(client = %key, "Rate limit exceeded");
            let mut response = AppError::RateLimited(retry_after).into_response();
            response
                .headers_mut()
                .insert("X-RateLimit-Limit", HeaderValue::from(limiter.max_requests));
            response
        }
    }
}

/// Socket peer address only; forwarding headers can be spoofed.
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "ip:unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn test_remaining_counts_down_then_blocks() {
        let limiter = RateLimiter::new(3, 60);
        assert_eq!(limiter.check_rate_limit("k").await, Ok(2));
        assert_eq!(limiter.check_rate_limit("k").await, Ok(1));
        assert_eq!(limiter.check_rate_limit("k").await, Ok(0));
        assert!(matches!(
            limiter.check_rate_limit("k").await,
            Err(secs) if (1..=60).contains(&secs)
        ));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.check_rate_limit("ip:10.0.0.1").await.is_ok());
        assert!(limiter.check_rate_limit("ip:10.0.0.1").await.is_err());
        assert!(limiter.check_rate_limit("ip:10.0.0.2").await.is_ok());
    }

    #[tokio::test]
    async fn test_window_reset_and_cleanup() {
        let limiter = RateLimiter::new(1, 1);
        assert!(limiter.check_rate_limit("a").await.is_ok());
        assert!(limiter.check_rate_limit("a").await.is_err());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        limiter.cleanup_expired().await;
        assert!(limiter.requests.read().await.is_empty());
        assert_eq!(limiter.check_rate_limit("a").await, Ok(0));
    }

    #[test]
    fn test_client_key_ignores_forwarding_headers() {
        let mut request = Request::builder()
            .header("X-Forwarded-For", "1.2.3.4")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "ip:unknown");

        let addr: SocketAddr = "10.0.0.5:9999".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_key(&request), "ip:10.0.0.5");
    }
}
