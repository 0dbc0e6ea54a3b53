//! # webshare-api
//!
//! HTTP layer beside the signaling socket:
//! - relay credentials for the browser client, rate limited per requester
//! - health and stats for operators
//!
//! Nothing here sits on the signaling path; a slow credential service only
//! delays the HTTP request waiting on it.

pub mod credentials;
pub mod rate_limit;
pub mod routes;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use credentials::CredentialRelay;
use rate_limit::RateLimiter;
use std::sync::Arc;
use tokio::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use webshare_common::error::WebshareError;
use webshare_signaling::SignalingHub;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Signaling hub, read for `/stats`.
    pub hub: SignalingHub,
    pub credentials: CredentialRelay,
    pub limiter: RateLimiter,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(hub: SignalingHub, credentials: CredentialRelay, limiter: RateLimiter) -> Self {
        Self {
            hub,
            credentials,
            limiter,
            started_at: Instant::now(),
        }
    }
}

/// Build the HTTP router with CORS restricted to `allowed_origins`.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .merge(routes::turn::router())
        .merge(routes::health::router())
        .fallback(not_found)
        .layer(cors_layer(allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn not_found() -> WebshareError {
    WebshareError::NotFound {
        resource: "Route".into(),
    }
}
