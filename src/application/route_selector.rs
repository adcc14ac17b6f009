//! Route Selector
//!
//! Chooses a route key for an inbound message from a configurable
//! `$request.body.<path>` expression.

use crate::domain::{IntegrationTable, ROUTE_DEFAULT};

/// Prefix every route selection expression must carry
const EXPRESSION_PREFIX: &str = "$request.body.";

/// A route selection expression that does not match the
/// `$request.body.<path>` grammar.
#[derive(Debug, thiserror::Error)]
#[error("invalid route selection expression {0:?}: expected $request.body.<path>")]
pub struct InvalidExpression(pub String);

/// Selects a route key for inbound messages.
///
/// The expression is fixed at configuration time. Without one, every
/// message routes to `$default`.
#[derive(Debug, Clone, Default)]
pub struct RouteSelector {
    /// Dot-separated member path into the message body, if configured
    path: Option<Vec<String>>,
}

impl RouteSelector {
    /// Compile the configured expression, if any.
    pub fn from_expression(expression: Option<&str>) -> Result<Self, InvalidExpression> {
        let Some(expression) = expression else {
            return Ok(Self { path: None });
        };

        let path = expression
            .strip_prefix(EXPRESSION_PREFIX)
            .ok_or_else(|| InvalidExpression(expression.to_string()))?;
        let segments: Vec<String> = path.split('.').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(InvalidExpression(expression.to_string()));
        }

        Ok(Self {
            path: Some(segments),
        })
    }

    /// Choose the route key for a message.
    ///
    /// Falls back to `$default` when no expression is configured, the
    /// message is not JSON, the path does not resolve, the terminal value
    /// is not a string, or the terminal string is not a key in the
    /// integration table.
    pub fn select(&self, message: &str, table: &IntegrationTable) -> String {
        let Some(path) = &self.path else {
            return ROUTE_DEFAULT.to_string();
        };

        let Ok(parsed) = serde_json::from_str::<serde_json::Value>(message) else {
            return ROUTE_DEFAULT.to_string();
        };

        let mut current = &parsed;
        for segment in path {
            match current.as_object().and_then(|obj| obj.get(segment)) {
                Some(next) => current = next,
                None => return ROUTE_DEFAULT.to_string(),
            }
        }

        match current.as_str() {
            Some(key) if table.contains(key) => key.to_string(),
            _ => ROUTE_DEFAULT.to_string(),
        }
    }
}
