use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::AppState;

const PRUNE_ABOVE: usize = 10_000;

/// Fixed-window request counter, one window per client address.
#[derive(Clone)]
pub struct RateLimiter {
    clients: Arc<Mutex<HashMap<String, Window>>>,
    limit: u32,
    window: Duration,
}

struct Window {
    opened: Instant,
    hits: u32,
}

impl RateLimiter {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window: Duration::from_secs(window_secs),
        }
    }

    pub async fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Instant::now()).await
    }

    async fn allow_at(&self, client: &str, now: Instant) -> bool {
        let window = self.window;
        let mut clients = self.clients.lock().await;
        if clients.len() > PRUNE_ABOVE {
            clients.retain(|_, w| now.saturating_duration_since(w.opened) < window);
        }

        let w = clients
            .entry(client.to_owned())
            .or_insert(Window { opened: now, hits: 0 });
        if now.saturating_duration_since(w.opened) >= window {
            *w = Window { opened: now, hits: 0 };
        }
        w.hits = w.hits.saturating_add(1);
        w.hits <= self.limit
    }
}

/// Peer address when served with connect info, else the first forwarded hop.
fn client_address(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .or_else(|| {
            let forwarded = req.headers().get("x-forwarded-for")?.to_str().ok()?;
            forwarded.split(',').next().map(|hop| hop.trim().to_owned())
        })
        .unwrap_or_else(|| "unknown".to_owned())
}

async fn enforce(
    limiter: &RateLimiter,
    scope: &'static str,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_address(&req);
    if !limiter.allow(&client).await {
        tracing::warn!(%client, scope, "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }
    Ok(next.run(req).await)
}

/// Middleware: every API request.
pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state.rate_limiter, "api", req, next).await
}

/// Middleware: submissions and retries, which write to the booking store.
pub async fn submit_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state.submit_rate_limiter, "submit", req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn window_allows_up_to_limit_then_reopens() {
        let limiter = RateLimiter::new(2, 60);
        let t0 = Instant::now();
        assert!(limiter.allow_at("10.0.0.1", t0).await);
        assert!(limiter.allow_at("10.0.0.1", t0 + Duration::from_secs(1)).await);
        assert!(!limiter.allow_at("10.0.0.1", t0 + Duration::from_secs(2)).await);
        assert!(limiter.allow_at("10.0.0.2", t0 + Duration::from_secs(2)).await);
        assert!(limiter.allow_at("10.0.0.1", t0 + Duration::from_secs(60)).await);
    }

    #[test]
    fn forwarded_header_names_the_client() {
        let req = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_address(&req), "203.0.113.7");

        let req = axum::http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_address(&req), "unknown");
    }
}
