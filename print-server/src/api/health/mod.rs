//! Health check route
//!
//! ```json
//! {
//!   "status": "ok",
//!   "version": "0.1.0",
//!   "platform": "unix",
//!   "printer": "lp",
//!   "activeJobs": 0,
//!   "uptimeSeconds": 42
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    platform: String,
    /// Resolved print program, absent on unsupported platforms
    #[serde(skip_serializing_if = "Option::is_none")]
    printer: Option<String>,
    active_jobs: usize,
    uptime_seconds: u64,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let service = &state.print_service;
    let printer = service
        .resolve_printer()
        .ok()
        .map(|p| p.command().program_name());

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        platform: service.platform().to_string(),
        printer,
        active_jobs: state.jobs().active_count(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
