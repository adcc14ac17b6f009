//! Connection Management Handlers
//!
//! The `/@connections/{id}` surface: push a frame to a client, inspect a
//! session, or close it. The path parameter is URL-decoded before lookup.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::SecondsFormat;
use serde::Serialize;

use crate::domain::CloseCause;
use crate::shared::AppError;
use crate::startup::AppState;

/// Metadata returned by `GET /@connections/{id}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    pub connection_id: String,
    pub connected_at: String,
    pub last_active_at: String,
}

/// `POST /@connections/{id}` — write the request body verbatim to the
/// client socket. Counts as activity: the idle clock is reset, the hard
/// clock is not.
pub async fn post_to_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<String>,
    body: String,
) -> Result<StatusCode, AppError> {
    let session = state
        .gateway
        .get(&connection_id)
        .ok_or_else(|| AppError::Gone(connection_id.clone()))?;

    if !session.send_text(body) {
        return Err(AppError::Gone(connection_id));
    }

    session.touch();
    state.timeouts.reset_idle(&connection_id);
    tracing::debug!(connection_id = %connection_id, "Management push delivered");
    Ok(StatusCode::OK)
}

/// `GET /@connections/{id}` — session metadata with ISO-8601 timestamps.
pub async fn get_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<String>,
) -> Result<Json<ConnectionDetails>, AppError> {
    let session = state
        .gateway
        .get(&connection_id)
        .filter(|s| !s.is_closing())
        .ok_or_else(|| AppError::Gone(connection_id.clone()))?;

    Ok(Json(ConnectionDetails {
        connection_id,
        connected_at: session
            .info
            .connected_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        last_active_at: session
            .last_active()
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// `DELETE /@connections/{id}` — close the client socket with 1000.
pub async fn delete_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.gateway.close(&connection_id, CloseCause::Management) {
        return Err(AppError::Gone(connection_id));
    }
    tracing::info!(connection_id = %connection_id, "Session closed by management API");
    Ok(StatusCode::NO_CONTENT)
}
