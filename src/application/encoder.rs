//! Event Encoder
//!
//! Shapes per-session events into the on-wire structure backend
//! integrations expect. Two modes exist: the lambda-proxy JSON object that
//! mirrors the cloud service's proxy event, and a raw-body mode that
//! carries the context in HTTP headers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::ConnectionInfo;
use crate::shared::ids;

/// A session lifecycle or message event to be delivered to the backend.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Connect,
    Disconnect { status_code: u16, reason: String },
    Message { body: String },
}

impl SessionEvent {
    /// Event type literal used on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::Connect => "CONNECT",
            SessionEvent::Disconnect { .. } => "DISCONNECT",
            SessionEvent::Message { .. } => "MESSAGE",
        }
    }

    /// Frame text carried by the event, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            SessionEvent::Message { body } => Some(body),
            _ => None,
        }
    }
}

/// Lambda-proxy event payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEvent {
    pub request_context: RequestContext,
    pub headers: HashMap<String, String>,
    pub multi_value_headers: HashMap<String, Vec<String>>,
    /// `null` (not an empty object) when the connect URL had no parameters
    pub query_string_parameters: Option<HashMap<String, String>>,
    /// Frame text for MESSAGE, `null` for CONNECT and DISCONNECT
    pub body: Option<String>,
    pub is_base64_encoded: bool,
}

/// The `requestContext` object of a lambda-proxy payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub route_key: String,
    pub event_type: &'static str,
    pub extended_request_id: String,
    pub request_id: String,
    pub request_time: String,
    pub message_direction: &'static str,
    pub stage: String,
    pub connected_at: i64,
    pub request_time_epoch: i64,
    pub identity: Identity,
    pub domain_name: String,
    pub connection_id: String,
    pub api_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnect_status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnect_reason: Option<String>,
}

/// Client identity as reported to the backend.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub source_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Produces backend payloads for session events.
#[derive(Debug, Clone)]
pub struct EventEncoder {
    stage: String,
    domain_name: String,
    api_id: String,
}

impl EventEncoder {
    pub fn new(stage: String, domain_name: String, api_id: String) -> Self {
        Self {
            stage,
            domain_name,
            api_id,
        }
    }

    /// Build the lambda-proxy JSON payload for an event, stamped with the
    /// current wall-clock time.
    pub fn proxy_payload(
        &self,
        route_key: &str,
        info: &ConnectionInfo,
        event: &SessionEvent,
    ) -> ProxyEvent {
        let now = Utc::now();
        let request_id = ids::request_id();

        let (message_id, disconnect_status_code, disconnect_reason) = match event {
            SessionEvent::Connect => (None, None, None),
            SessionEvent::Message { .. } => (Some(ids::short_id()), None, None),
            SessionEvent::Disconnect {
                status_code,
                reason,
            } => (None, Some(*status_code), Some(reason.clone())),
        };

        let multi_value_headers = info
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), vec![v.clone()]))
            .collect();

        ProxyEvent {
            request_context: RequestContext {
                route_key: route_key.to_string(),
                event_type: event.event_type(),
                extended_request_id: request_id.clone(),
                request_id,
                request_time: format_request_time(now),
                message_direction: "IN",
                stage: self.stage.clone(),
                connected_at: info.connected_at_ms(),
                request_time_epoch: now.timestamp_millis(),
                identity: Identity {
                    source_ip: info.source_ip.clone(),
                    user_agent: if info.user_agent.is_empty() {
                        None
                    } else {
                        Some(info.user_agent.clone())
                    },
                },
                domain_name: self.domain_name.clone(),
                connection_id: info.id.clone(),
                api_id: self.api_id.clone(),
                message_id,
                disconnect_status_code,
                disconnect_reason,
            },
            headers: info.headers.clone(),
            multi_value_headers,
            query_string_parameters: info.query_map(),
            body: event.body().map(str::to_owned),
            is_base64_encoded: false,
        }
    }

    /// Context headers for http-headers mode: `connectionId`,
    /// `x-event-type`, `x-route-key`, the connect-time headers passed
    /// through, and the disconnect fields when applicable.
    pub fn header_context(
        &self,
        route_key: &str,
        info: &ConnectionInfo,
        event: &SessionEvent,
    ) -> Vec<(String, String)> {
        let mut headers = vec![
            ("connectionId".to_string(), info.id.clone()),
            ("x-event-type".to_string(), event.event_type().to_string()),
            ("x-route-key".to_string(), route_key.to_string()),
        ];
        for (name, value) in &info.headers {
            headers.push((name.clone(), value.clone()));
        }
        if let SessionEvent::Disconnect {
            status_code,
            reason,
        } = event
        {
            headers.push((
                "x-disconnect-status-code".to_string(),
                status_code.to_string(),
            ));
            headers.push(("x-disconnect-reason".to_string(), reason.clone()));
        }
        headers
    }
}

/// Format an event timestamp as `DD/Mon/YYYY:HH:MM:SS +0000` in UTC with
/// English month abbreviations.
pub fn format_request_time(time: DateTime<Utc>) -> String {
    time.format("%d/%b/%Y:%H:%M:%S +0000").to_string()
}
