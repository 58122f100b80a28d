//! Health and version endpoints
//!
//! - /health  - Liveness plus database status (always 200 while running)
//! - /version - Build information for deployment verification

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::routes::response::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle GET /health
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    let response = match state.db.ping() {
        Ok(()) => HealthResponse {
            status: "up",
            database: "up",
            error: None,
        },
        Err(e) => {
            warn!("Health check: database down: {}", e);
            HealthResponse {
                status: "down",
                database: "down",
                error: Some("database unreachable".into()),
            }
        }
    };

    json_response(StatusCode::OK, &response)
}

/// Handle GET /version
pub fn version_info() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
            commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
            build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
            service: "turnstile",
        },
    )
}
