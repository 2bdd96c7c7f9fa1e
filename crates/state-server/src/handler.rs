use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::header::HOST;
use axum::http::HeaderMap;
use axum::response::Json;
use serde_json::json;

use state_pipeline::{public_reference, StatePipeline};
use state_types::StateDocument;

use crate::error::ServerResult;

pub const FORWARDED_USER: &str = "x-forwarded-user";
pub const FORWARDED_HOST: &str = "x-forwarded-host";
pub const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: Arc<StatePipeline>,
    /// Fixed base for returned references; overrides request headers.
    pub public_base_url: Option<String>,
}

impl AppState {
    pub fn new(pipeline: Arc<StatePipeline>, public_base_url: Option<String>) -> Self {
        Self {
            pipeline,
            public_base_url,
        }
    }

    /// Scheme and host callers should use to reach this server.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.public_base_url {
            return base.clone();
        }
        let proto = header_str(headers, FORWARDED_PROTO).unwrap_or("http");
        let host = header_str(headers, FORWARDED_HOST)
            .or_else(|| header_str(headers, HOST.as_str()))
            .unwrap_or("localhost");
        format!("{proto}://{host}")
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Who a save is attributed to: the forwarded user, else the peer address.
pub fn attribution(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    header_str(headers, FORWARDED_USER)
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.to_string()))
}

/// Liveness probe kept at the document endpoint.
pub async fn hello_handler() -> &'static str {
    "Hello, World!"
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Serve a saved state document.
pub async fn get_state_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<StateDocument>> {
    let document = state.pipeline.load(&id).await?;
    Ok(Json(document))
}

/// Save the request body and answer with its public reference.
pub async fn save_state_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Json<String>> {
    let user = attribution(&headers, peer.map(|ConnectInfo(addr)| addr));
    let receipt = state.pipeline.save(&body, user.as_deref()).await?;

    for failed in receipt.layers.failures() {
        tracing::warn!(
            id = %receipt.id(),
            layer = %failed.name,
            action = %failed.action,
            "layer action failed during save"
        );
    }
    tracing::info!(
        id = %receipt.id(),
        user = user.as_deref().unwrap_or("-"),
        elapsed_ms = receipt.elapsed.as_millis() as u64,
        "saved state"
    );

    Ok(Json(public_reference(&state.base_url(&headers), receipt.id())))
}
