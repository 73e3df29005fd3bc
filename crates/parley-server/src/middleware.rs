use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use parley_identity::{authenticate, User};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::AppState;

/// The authenticated user, stored in request extensions by
/// [`auth_middleware`] for handlers to extract.
#[derive(Clone, Debug)]
pub struct AuthContext(pub User);

/// Middleware to authenticate requests via `Authorization: Bearer <jwt>`.
///
/// Verifies the token signature and expiry, then confirms the user still
/// exists in the database. Every failure mode is a bare 401 — the guard
/// fails closed and leaks nothing about why.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let token = match req.headers().get("Authorization") {
        Some(val) => {
            let val_str = val.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
            match val_str.strip_prefix("Bearer ") {
                Some(token) => token.to_string(),
                None => return Err(StatusCode::UNAUTHORIZED),
            }
        }
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?
        .clone();

    // Token verification hits the database to confirm the user still
    // exists, so it runs on the blocking pool.
    let user = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        authenticate(&conn, &state.token_keys, &token).map_err(|_| StatusCode::UNAUTHORIZED)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    req.extensions_mut().insert(AuthContext(user));

    Ok(next.run(req).await)
}

/// Rate limiting key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(IpAddr);

/// In-memory rate limiter state.
///
/// Uses a simple fixed window counter.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    state: Arc<Mutex<HashMap<RateLimitKey, (u32, Instant)>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if the request is allowed.
    ///
    /// Returns `true` if allowed, `false` if limit exceeded.
    pub fn check(&self, key: RateLimitKey, limit: u32) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // Lock poisoned by a panicked thread. Recover with the stale
                // counters; refusing all requests over a poisoned limiter
                // would be a self-inflicted denial of service.
                tracing::error!("rate limiter lock poisoned, recovering with stale state");
                poisoned.into_inner()
            }
        };
        let now = Instant::now();

        // Periodic cleanup to prevent memory leak. Evict only entries whose
        // window has expired so active limits survive the sweep.
        if state.len() > 10000 {
            state.retain(|_, (_, start)| now.duration_since(*start) <= Duration::from_secs(60));
        }

        let (count, start) = state.entry(key).or_insert((0, now));

        if now.duration_since(*start) > Duration::from_secs(60) {
            // Reset window
            *count = 1;
            *start = now;
            true
        } else {
            *count += 1;
            *count <= limit
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limiting middleware, keyed by client IP.
pub async fn rate_limit_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?
        .clone();

    // Requests served without a socket address (in-process tests, unix
    // sockets) share a single loopback bucket.
    let key = match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => RateLimitKey(addr.ip()),
        None => RateLimitKey(IpAddr::V4(Ipv4Addr::LOCALHOST)),
    };

    if !state.rate_limiter.check(key, state.rate_limit_per_minute) {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        response.headers_mut().insert(
            axum::http::header::RETRY_AFTER,
            axum::http::HeaderValue::from_static("60"),
        );
        return Ok(response);
    }

    Ok(next.run(req).await)
}
