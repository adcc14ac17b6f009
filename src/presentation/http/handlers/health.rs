//! Health Check Handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::startup::AppState;

/// Health response: live-session count and process uptime
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
    pub uptime: u64,
    pub version: &'static str,
}

/// `GET /health` — always 200, never mutates state.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.gateway.count(),
        uptime: state.started.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
