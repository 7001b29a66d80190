//! Health check endpoints
//!
//! - /health, /healthz - Liveness probe (is the process serving?)
//! - /ready, /readyz - Readiness probe (is the credential store reachable?)
//! - /version - Build information

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// "ok" or "unavailable"
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since startup
    pub uptime: u64,
    pub timestamp: String,
    /// Operating mode
    pub mode: &'static str,
    pub node_id: String,
    pub store: StoreHealth,
}

#[derive(Serialize)]
pub struct StoreHealth {
    /// Backend name ("mongodb" or "memory")
    pub backend: &'static str,
    /// Only set by the readiness probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reachable: Option<bool>,
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    /// Service name
    pub service: &'static str,
}

fn build_health_response(state: &AppState, reachable: Option<bool>) -> HealthResponse {
    let args = &state.args;
    let ready = reachable.unwrap_or(true);

    HealthResponse {
        healthy: ready,
        status: if ready { "ok" } else { "unavailable" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if args.dev_mode {
            "development"
        } else {
            "production"
        },
        node_id: args.node_id.to_string(),
        store: StoreHealth {
            backend: state.accounts.store().backend(),
            reachable,
        },
    }
}

fn json_ok(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Handle liveness probe (/health, /healthz)
///
/// Always 200 while the process can answer.
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state, None);

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());

    json_ok(StatusCode::OK, body)
}

/// Handle readiness probe (/ready, /readyz)
///
/// 200 when the store answers a ping, 503 otherwise. The failure detail is
/// logged but not returned.
pub async fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let reachable = match state.accounts.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            false
        }
    };

    let response = build_health_response(&state, Some(reachable));

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":false,"error":"Serialization failed"}"#.to_string());

    let status = if reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    json_ok(status, body)
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "gatehouse",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());

    json_ok(StatusCode::OK, body)
}
