//! Session Model
//!
//! Connect-time snapshot of a WebSocket session and the taxonomy of ways a
//! session can end.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};

/// Immutable snapshot of a WebSocket session, captured at connect time.
///
/// Mutable per-session state (activity timestamp, closing flag) lives with
/// the live-session registry; this struct never changes after admission.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Stable connection identity, unique for the process uptime
    pub id: String,

    /// Wall-clock moment the upgrade completed
    pub connected_at: DateTime<Utc>,

    /// Query parameters from the connect URL, in request order.
    /// Duplicate names are preserved here; only the last value per name is
    /// exposed to the backend.
    pub query: Vec<(String, String)>,

    /// Request headers at connect time: names lowercased, first value wins
    pub headers: HashMap<String, String>,

    /// Client source address, IPv4-mapped IPv6 normalized to IPv4
    pub source_ip: String,

    /// User agent string, empty when the client sent none
    pub user_agent: String,
}

impl ConnectionInfo {
    /// Session creation time in milliseconds since epoch.
    pub fn connected_at_ms(&self) -> i64 {
        self.connected_at.timestamp_millis()
    }

    /// Query parameters as exposed to the backend: last value per name,
    /// `None` when the connect URL carried no parameters.
    pub fn query_map(&self) -> Option<HashMap<String, String>> {
        if self.query.is_empty() {
            return None;
        }
        let mut map = HashMap::new();
        for (name, value) in &self.query {
            map.insert(name.clone(), value.clone());
        }
        Some(map)
    }
}

/// Normalize a client address for the `identity.sourceIp` field.
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are reported in their
/// IPv4 form.
pub fn normalize_source_ip(addr: IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => v6.to_string(),
        },
    }
}

/// Why a session ended.
///
/// Every termination path funnels through exactly one of these causes; the
/// cause decides the close code, the close reason, and whether the backend
/// is owed a `DISCONNECT` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseCause {
    /// Client sent a close frame
    ClientClose { code: u16, reason: String },
    /// Client socket failed mid-stream
    ClientError,
    /// Idle clock expired with no activity
    IdleTimeout,
    /// Hard clock expired, regardless of activity
    HardTimeout,
    /// `DELETE /@connections/{id}` from the management API
    Management,
    /// Backend rejected or never received the `$connect` event
    ConnectFailed,
    /// Process is shutting down
    Shutdown,
}

impl CloseCause {
    /// WebSocket close code written to the client.
    pub fn close_code(&self) -> u16 {
        match self {
            CloseCause::ClientClose { code, .. } => *code,
            CloseCause::ClientError => 1006,
            CloseCause::IdleTimeout | CloseCause::HardTimeout | CloseCause::Shutdown => 1001,
            CloseCause::Management => 1000,
            CloseCause::ConnectFailed => 1011,
        }
    }

    /// Close reason written to the client.
    pub fn reason(&self) -> &str {
        match self {
            CloseCause::ClientClose { reason, .. } => reason,
            CloseCause::ClientError => "",
            CloseCause::IdleTimeout => "Idle timeout",
            CloseCause::HardTimeout => "Connection lifetime exceeded",
            CloseCause::Management => "Closed by management API",
            CloseCause::ConnectFailed => "Backend connect failed",
            CloseCause::Shutdown => "Server shutting down",
        }
    }

    /// Whether this cause owes the backend a `DISCONNECT` event.
    ///
    /// A failed `$connect` never dispatches one, and neither does process
    /// shutdown.
    pub fn dispatches_disconnect(&self) -> bool {
        !matches!(self, CloseCause::ConnectFailed | CloseCause::Shutdown)
    }
}
