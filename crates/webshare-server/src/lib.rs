//! # webshare-server
//!
//! Wires the signaling socket and the HTTP endpoints onto one router so a
//! single listener serves both, the way the browser client expects.

use axum::Router;
use std::time::Duration;
use tokio::task::JoinHandle;
use webshare_api::{credentials::CredentialRelay, rate_limit::RateLimiter, AppState};
use webshare_common::config::AppConfig;
use webshare_signaling::SignalingHub;

/// A composed application: the router plus the hub it routes into.
pub struct App {
    pub router: Router,
    pub hub: SignalingHub,
}

/// Build the full router from configuration.
pub fn build_app(config: &AppConfig) -> anyhow::Result<App> {
    let hub = SignalingHub::new(config.signaling.outbound_buffer);

    let credentials = CredentialRelay::new(
        config.turn.api_url.clone(),
        config.turn.api_key.clone(),
        Duration::from_secs(config.turn.timeout_secs),
    )?;
    if config.turn.api_key.as_deref().is_none_or(str::is_empty) {
        tracing::warn!("No credential service key configured; serving fallback ICE servers only");
    }
    let limiter = RateLimiter::per_minute(config.turn.rate_limit_per_minute)
        .trust_forwarded_for(config.turn.trust_forwarded_for);

    let api_state = AppState::new(hub.clone(), credentials, limiter);
    let router = webshare_signaling::build_router(hub.clone())
        .merge(webshare_api::build_router(api_state, &config.cors.allowed_origins));

    Ok(App { router, hub })
}

/// Start the keepalive supervisor for `hub`.
pub fn spawn_keepalive(config: &AppConfig, hub: SignalingHub) -> JoinHandle<()> {
    let interval = Duration::from_secs(config.signaling.keepalive_interval_secs.max(1));
    webshare_signaling::keepalive::spawn(hub, interval)
}
