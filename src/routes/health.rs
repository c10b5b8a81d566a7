//! Health check endpoint

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::json_response;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Short git commit the binary was built from
    pub commit: &'static str,
    /// "development" or "production"
    pub mode: &'static str,
    /// Backing store: "mongodb" or "memory"
    pub storage: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
}

/// Liveness probe
pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        mode: state.args.mode(),
        storage: state.storage,
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: state.service.now().at.to_rfc3339(),
    };

    json_response(StatusCode::OK, &response)
}
