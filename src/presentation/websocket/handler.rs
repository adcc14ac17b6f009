//! WebSocket Connection Handler
//!
//! Drives one session from admission through teardown: snapshot the
//! connect-time request, register the session, deliver the CONNECT event,
//! pump inbound frames, and settle the DISCONNECT exactly once.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        ConnectInfo, RawQuery, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::application::SessionEvent;
use crate::domain::{session, CloseCause, ConnectionInfo, ROUTE_CONNECT, ROUTE_DISCONNECT};
use crate::startup::AppState;

use super::gateway::ConnectedSession;
use super::messages::SessionCommand;

/// Close code reported when the client's close frame carried no status
const NO_STATUS_RECEIVED: u16 = 1005;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    // Snapshot the request before the protocol switch; nothing of it is
    // available once the socket is upgraded.
    let query = parse_query(query.as_deref());
    let headers = snapshot_headers(&headers);
    let user_agent = headers.get("user-agent").cloned().unwrap_or_default();
    let source_ip = session::normalize_source_ip(peer.ip());

    ws.on_upgrade(move |socket| {
        handle_socket(socket, state, query, headers, source_ip, user_agent)
    })
}

/// Decode the connect-time query string into ordered (name, value) pairs.
fn parse_query(raw: Option<&str>) -> Vec<(String, String)> {
    match raw {
        Some(raw) => url::form_urlencoded::parse(raw.as_bytes())
            .into_owned()
            .collect(),
        None => Vec::new(),
    }
}

/// Snapshot request headers: names lowercased, first value per name wins.
fn snapshot_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut snapshot = HashMap::new();
    for (name, value) in headers.iter() {
        snapshot
            .entry(name.as_str().to_string())
            .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    snapshot
}

/// Handle one WebSocket connection for its full lifetime.
async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    query: Vec<(String, String)>,
    headers: HashMap<String, String>,
    source_ip: String,
    user_agent: String,
) {
    let info = ConnectionInfo {
        id: state.ids.generate(),
        connected_at: Utc::now(),
        query,
        headers,
        source_ip,
        user_agent,
    };
    let connection_id = info.id.clone();

    tracing::debug!(connection_id = %connection_id, "New WebSocket connection");

    // Split socket for concurrent read/write; the writer task is the only
    // owner of the sink, so management pushes are serialized per socket.
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<SessionCommand>();

    let mut writer = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                SessionCommand::Text(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                SessionCommand::Close { code, reason } => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    // The session enters the live set before the CONNECT event is sent
    let session = state.gateway.register(info, tx);
    state.timeouts.start(&connection_id);

    // Admission: the backend must accept $connect or the session dies 1011
    let outcome = state
        .dispatcher
        .dispatch(ROUTE_CONNECT, &session.info, &SessionEvent::Connect)
        .await;
    if outcome.is_accepted() {
        session.mark_connect_accepted();
        tracing::info!(connection_id = %connection_id, "Session admitted");
    } else {
        tracing::warn!(
            connection_id = %connection_id,
            outcome = ?outcome,
            "Backend refused $connect, closing session"
        );
        session.begin_close(CloseCause::ConnectFailed);
    }

    // Read loop. Exits when the client closes or errors, or as soon as the
    // writer has emitted a server-initiated close frame — a client that
    // never answers our close cannot pin the session.
    let mut observed: Option<CloseCause> = None;
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_frame(&state, &session, text).await,
                Some(Ok(Message::Binary(bytes))) => {
                    // Binary frames are surfaced to the backend as text
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    handle_frame(&state, &session, text).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    observed = Some(match frame {
                        Some(frame) => CloseCause::ClientClose {
                            code: frame.code,
                            reason: frame.reason.to_string(),
                        },
                        None => CloseCause::ClientClose {
                            code: NO_STATUS_RECEIVED,
                            reason: String::new(),
                        },
                    });
                    break;
                }
                // Ping/pong are answered by the protocol layer
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                    observed = Some(CloseCause::ClientError);
                    break;
                }
                None => {
                    observed = Some(CloseCause::ClientError);
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    // Teardown runs exactly once, on this task
    let cause = session.observe_close(observed.unwrap_or(CloseCause::ClientError));
    teardown(&state, &session, cause).await;

    if !writer.is_finished() {
        writer.abort();
    }
}

/// One inbound frame: bump activity, reset the idle clock, route, dispatch.
async fn handle_frame(state: &AppState, session: &ConnectedSession, text: String) {
    session.touch();
    state.timeouts.reset_idle(&session.info.id);

    // Frames racing an unadmitted or closing session are not forwarded:
    // CONNECT precedes every MESSAGE the backend sees
    if !session.connect_accepted() || session.is_closing() {
        return;
    }

    let route_key = state.selector.select(&text, state.dispatcher.table());
    let outcome = state
        .dispatcher
        .dispatch(
            &route_key,
            &session.info,
            &SessionEvent::Message { body: text },
        )
        .await;
    if !outcome.is_accepted() {
        // Message delivery failures never tear down the session
        tracing::warn!(
            connection_id = %session.info.id,
            route_key = %route_key,
            outcome = ?outcome,
            "Dropped message event"
        );
    }
}

/// Settle a finished session: cancel timers, owe the DISCONNECT where due,
/// and drop it from the live set.
async fn teardown(state: &AppState, session: &ConnectedSession, cause: CloseCause) {
    let connection_id = &session.info.id;
    state.timeouts.cancel(connection_id);

    if cause.dispatches_disconnect() && session.connect_accepted() {
        let event = SessionEvent::Disconnect {
            status_code: cause.close_code(),
            reason: cause.reason().to_string(),
        };
        let outcome = state
            .dispatcher
            .dispatch(ROUTE_DISCONNECT, &session.info, &event)
            .await;
        if !outcome.is_accepted() {
            // The session is already gone; nothing to recover
            tracing::warn!(
                connection_id = %connection_id,
                outcome = ?outcome,
                "Failed to deliver $disconnect"
            );
        }
    }

    state.gateway.remove(connection_id);
    tracing::info!(
        connection_id = %connection_id,
        cause = ?cause,
        "Session closed"
    );
}
