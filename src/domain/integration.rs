//! Integration Table
//!
//! Mapping from route keys to backend integration URIs.

use std::collections::HashMap;

/// Route key for the session-connect lifecycle event
pub const ROUTE_CONNECT: &str = "$connect";

/// Route key for the session-disconnect lifecycle event
pub const ROUTE_DISCONNECT: &str = "$disconnect";

/// Fallback route key for message routing
pub const ROUTE_DEFAULT: &str = "$default";

/// A route key that is not acceptable in an integration table.
#[derive(Debug, thiserror::Error)]
#[error("invalid route key {key:?}: {reason}")]
pub struct InvalidRouteKey {
    pub key: String,
    pub reason: &'static str,
}

/// Mapping from route key to backend HTTP URI.
///
/// Well-known keys are `$connect`, `$disconnect` and `$default`;
/// user-defined keys are arbitrary non-empty strings that do not begin
/// with `$`. Fallback to `$default` applies only to message routing,
/// never to connect/disconnect, and is the caller's responsibility.
#[derive(Debug, Clone, Default)]
pub struct IntegrationTable {
    routes: HashMap<String, String>,
}

impl IntegrationTable {
    /// Build a table from configuration, validating every route key.
    pub fn new(routes: HashMap<String, String>) -> Result<Self, InvalidRouteKey> {
        for key in routes.keys() {
            if key.is_empty() {
                return Err(InvalidRouteKey {
                    key: key.clone(),
                    reason: "route keys must be non-empty",
                });
            }
            if key.starts_with('$')
                && key != ROUTE_CONNECT
                && key != ROUTE_DISCONNECT
                && key != ROUTE_DEFAULT
            {
                return Err(InvalidRouteKey {
                    key: key.clone(),
                    reason: "only $connect, $disconnect and $default may start with '$'",
                });
            }
        }
        Ok(Self { routes })
    }

    /// Resolve a route key to its integration URI.
    pub fn uri(&self, route_key: &str) -> Option<&str> {
        self.routes.get(route_key).map(String::as_str)
    }

    /// Whether the table has an integration for this route key.
    pub fn contains(&self, route_key: &str) -> bool {
        self.routes.contains_key(route_key)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
