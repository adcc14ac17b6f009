//! WebSocket Gateway
//!
//! The live-session registry: owns every connected session for its full
//! lifetime and serializes state transitions on it. All cross-component
//! references go through connection-identity lookup here.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::domain::{CloseCause, ConnectionInfo};

use super::messages::SessionCommand;

/// One live WebSocket session.
///
/// The connect-time snapshot is immutable; the hot fields (activity
/// timestamp, closing state) are updated concurrently by the read loop,
/// timer firings, and management handlers.
pub struct ConnectedSession {
    /// Connect-time snapshot
    pub info: ConnectionInfo,
    /// Last observed activity, milliseconds since epoch. Monotonic.
    last_active_ms: AtomicI64,
    /// Whether the backend accepted the CONNECT event
    connect_accepted: AtomicBool,
    /// Set exactly once, by whichever close path wins
    closing: Mutex<Option<CloseCause>>,
    /// Channel to the session's writer task
    sender: mpsc::UnboundedSender<SessionCommand>,
}

impl ConnectedSession {
    fn new(info: ConnectionInfo, sender: mpsc::UnboundedSender<SessionCommand>) -> Self {
        let connected_ms = info.connected_at_ms();
        Self {
            info,
            last_active_ms: AtomicI64::new(connected_ms),
            connect_accepted: AtomicBool::new(false),
            closing: Mutex::new(None),
            sender,
        }
    }

    /// Record activity now. Never moves the timestamp backwards.
    pub fn touch(&self) {
        self.last_active_ms
            .fetch_max(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    /// Last observed activity as a UTC timestamp.
    pub fn last_active(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_active_ms.load(Ordering::SeqCst))
            .unwrap_or(self.info.connected_at)
    }

    pub fn mark_connect_accepted(&self) {
        self.connect_accepted.store(true, Ordering::SeqCst);
    }

    pub fn connect_accepted(&self) -> bool {
        self.connect_accepted.load(Ordering::SeqCst)
    }

    /// Whether a close has been observed or scheduled.
    pub fn is_closing(&self) -> bool {
        self.closing.lock().unwrap_or_else(std::sync::PoisonError::into_inner).is_some()
    }

    /// The cause recorded by the winning close path, if any.
    pub fn closing_cause(&self) -> Option<CloseCause> {
        self.closing.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Schedule a close: record the cause and instruct the writer to emit
    /// the close frame. Returns `false` if a close was already observed or
    /// scheduled — a double close is a no-op.
    ///
    /// No frame can be written after this returns: the closing flag is set
    /// under the same lock `send_text` checks.
    pub fn begin_close(&self, cause: CloseCause) -> bool {
        let mut closing = self.closing.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if closing.is_some() {
            return false;
        }
        let _ = self.sender.send(SessionCommand::Close {
            code: cause.close_code(),
            reason: cause.reason().to_string(),
        });
        *closing = Some(cause);
        true
    }

    /// Record that the socket is closing without writing a close frame,
    /// for causes observed on the socket itself (client close, error).
    /// Returns the cause that ends up recorded.
    pub fn observe_close(&self, cause: CloseCause) -> CloseCause {
        let mut closing = self.closing.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match &*closing {
            Some(existing) => existing.clone(),
            None => {
                *closing = Some(cause.clone());
                cause
            }
        }
    }

    /// Queue a text frame for the client. Returns `false` when the session
    /// is closing or its writer is gone.
    pub fn send_text(&self, text: String) -> bool {
        let closing = self.closing.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if closing.is_some() {
            return false;
        }
        self.sender.send(SessionCommand::Text(text)).is_ok()
    }
}

/// Registry of all live sessions, keyed by connection identity.
#[derive(Default)]
pub struct Gateway {
    sessions: DashMap<String, Arc<ConnectedSession>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly admitted session into the live set.
    pub fn register(
        &self,
        info: ConnectionInfo,
        sender: mpsc::UnboundedSender<SessionCommand>,
    ) -> Arc<ConnectedSession> {
        let session = Arc::new(ConnectedSession::new(info, sender));
        self.sessions
            .insert(session.info.id.clone(), session.clone());
        tracing::info!(
            connection_id = %session.info.id,
            source_ip = %session.info.source_ip,
            "Session registered"
        );
        session
    }

    /// Look up a live session by identity.
    pub fn get(&self, connection_id: &str) -> Option<Arc<ConnectedSession>> {
        self.sessions
            .get(connection_id)
            .map(|entry| entry.value().clone())
    }

    /// Remove a session from the live set.
    pub fn remove(&self, connection_id: &str) {
        if self.sessions.remove(connection_id).is_some() {
            tracing::info!(connection_id = %connection_id, "Session unregistered");
        }
    }

    /// Schedule a close for a session, checking liveness and open state
    /// first. Returns `false` when the session is absent or already
    /// closing.
    pub fn close(&self, connection_id: &str, cause: CloseCause) -> bool {
        match self.get(connection_id) {
            Some(session) => session.begin_close(cause),
            None => false,
        }
    }

    /// Close every live session with the same cause. Returns how many
    /// closes were actually scheduled.
    pub fn close_all(&self, cause: CloseCause) -> usize {
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.iter()
            .filter(|id| self.close(id, cause.clone()))
            .count()
    }

    /// Number of live sessions.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}
