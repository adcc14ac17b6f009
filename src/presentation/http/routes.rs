//! Route Configuration
//!
//! One router for the whole listener: WebSocket upgrades on `/`, the
//! management surface under `/@connections`, and the health probe. Any
//! other path is 404; unsupported methods on known paths are 405.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the shared HTTP/WebSocket router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // WebSocket clients connect at the root path
        .route("/", get(ws_handler))
        // Management API (postToConnection and friends)
        .route(
            "/@connections/:id",
            post(handlers::connections::post_to_connection)
                .get(handlers::connections::get_connection)
                .delete(handlers::connections::delete_connection),
        )
        // Health check endpoint
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
}
