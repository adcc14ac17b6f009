//! Integration Dispatcher
//!
//! Resolves a route key to a backend URI and performs the outbound POST,
//! classifying the outcome. Events are at-most-once: the dispatcher never
//! retries, it only reports what happened.

use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, error, warn};

use crate::application::{EventEncoder, SessionEvent};
use crate::config::IntegrationMode;
use crate::domain::{ConnectionInfo, IntegrationTable};

/// Upper bound on a single backend request, so a slow backend cannot wedge
/// session reaps.
const BACKEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Classified result of one backend delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Backend answered 2xx
    Accepted,
    /// Backend answered with a non-2xx status
    Rejected(u16),
    /// Transport error, DNS failure, refused connection, timeout, or no
    /// integration registered for the route
    Unreachable,
}

impl DispatchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DispatchOutcome::Accepted)
    }
}

/// Delivers session events to backend integrations.
pub struct IntegrationDispatcher {
    client: reqwest::Client,
    table: IntegrationTable,
    mode: IntegrationMode,
    encoder: EventEncoder,
}

impl IntegrationDispatcher {
    pub fn new(
        table: IntegrationTable,
        mode: IntegrationMode,
        encoder: EventEncoder,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(BACKEND_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            table,
            mode,
            encoder,
        })
    }

    /// The integration table this dispatcher resolves against.
    pub fn table(&self) -> &IntegrationTable {
        &self.table
    }

    /// Deliver one event for one session.
    ///
    /// For connect and disconnect the exact route key must be registered;
    /// for messages the caller has already routed via the selector, and a
    /// missing `$default` is tolerated with a warning.
    pub async fn dispatch(
        &self,
        route_key: &str,
        info: &ConnectionInfo,
        event: &SessionEvent,
    ) -> DispatchOutcome {
        let Some(uri) = self.table.uri(route_key) else {
            if matches!(event, SessionEvent::Message { .. }) {
                warn!(
                    connection_id = %info.id,
                    route_key = %route_key,
                    "No integration for message route, dropping event"
                );
            } else {
                error!(
                    connection_id = %info.id,
                    route_key = %route_key,
                    "No integration registered for lifecycle route"
                );
            }
            return DispatchOutcome::Unreachable;
        };

        let request = match self.mode {
            IntegrationMode::LambdaProxy => {
                let payload = self.encoder.proxy_payload(route_key, info, event);
                self.client.post(uri).json(&payload)
            }
            IntegrationMode::HttpHeaders => {
                let body = event.body().unwrap_or("").to_string();
                let content_type = if serde_json::from_str::<serde_json::Value>(&body).is_ok() {
                    "application/json"
                } else {
                    "text/plain"
                };
                self.client
                    .post(uri)
                    .query(&info.query)
                    .header("content-type", content_type)
                    .headers(context_headers(
                        self.encoder.header_context(route_key, info, event),
                    ))
                    .body(body)
            }
        };

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!(
                    connection_id = %info.id,
                    route_key = %route_key,
                    event_type = event.event_type(),
                    "Backend accepted event"
                );
                DispatchOutcome::Accepted
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!(
                    connection_id = %info.id,
                    route_key = %route_key,
                    event_type = event.event_type(),
                    status = status,
                    "Backend rejected event"
                );
                DispatchOutcome::Rejected(status)
            }
            Err(e) => {
                warn!(
                    connection_id = %info.id,
                    route_key = %route_key,
                    event_type = event.event_type(),
                    error = %e,
                    "Backend unreachable"
                );
                DispatchOutcome::Unreachable
            }
        }
    }
}

/// Convert encoder context pairs into a header map, skipping names or
/// values the HTTP layer cannot represent.
fn context_headers(pairs: Vec<(String, String)>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => debug!(header = %name, "Skipping unrepresentable context header"),
        }
    }
    map
}
