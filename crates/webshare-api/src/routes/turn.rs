//! Relay credential endpoint.
//!
//! Routes:
//! - GET /turn-credentials: ICE server list for the browser client
//! - GET /get-turn-credentials: same, older client path

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc};
use webshare_common::error::WebshareResult;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/turn-credentials", get(turn_credentials))
        .route("/get-turn-credentials", get(turn_credentials))
}

/// Answers with the credential service's list, or the fallback list when the
/// service is unusable. Only the per-requester limit produces an error.
async fn turn_credentials(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> WebshareResult<Json<Value>> {
    let requester = state.limiter.requester(&headers, peer);
    state.limiter.check(requester).await?;

    let (servers, source) = state.credentials.ice_servers().await;
    tracing::debug!(requester = %requester, source = ?source, "ICE servers served");
    Ok(Json(servers))
}
