//! Application settings and configuration structures.

use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all emulator settings.
///
/// Settings are immutable for the lifetime of the server instance.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Gateway behavior (stage, timeouts, integration mode)
    pub gateway: GatewaySettings,

    /// Integration table: route key -> backend URI
    #[serde(default)]
    pub integrations: HashMap<String, String>,

    /// Lower the default log filter to debug/trace
    #[serde(default)]
    pub verbose_logging: bool,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on (0 = OS-assigned, useful in tests)
    pub port: u16,
}

/// Gateway behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    /// Stage name reported in event payloads
    pub stage: String,

    /// API identifier reported in event payloads
    pub api_id: String,

    /// Public domain name; empty means `localhost:<port>`
    #[serde(default)]
    pub domain_name: String,

    /// Wire shape of outbound backend requests
    pub integration_mode: IntegrationMode,

    /// Optional `$request.body.<path>` expression for message routing
    #[serde(default)]
    pub route_selection_expression: Option<String>,

    /// Seconds of inactivity before a session is closed
    pub idle_timeout_secs: u64,

    /// Maximum session lifetime in seconds, regardless of activity
    pub hard_timeout_secs: u64,
}

/// Wire shape produced by the integration dispatcher.
///
/// Selected per server instance, not per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationMode {
    /// Single JSON object mirroring the cloud service's proxy event
    LambdaProxy,
    /// Raw frame body with context carried in request headers
    HttpHeaders,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if a timeout is zero.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("gateway.stage", "local")?
            .set_default("gateway.api_id", "local-api")?
            .set_default("gateway.integration_mode", "lambda-proxy")?
            .set_default("gateway.idle_timeout_secs", 600)?
            .set_default("gateway.hard_timeout_secs", 7200)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // GATEWAY__SERVER__PORT=3001 -> server.port = 3001
            .add_source(
                Environment::default()
                    .prefix("GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("gateway.stage", std::env::var("STAGE").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                if settings.gateway.idle_timeout_secs == 0
                    || settings.gateway.hard_timeout_secs == 0
                {
                    return Err(ConfigError::Message(
                        "idle_timeout_secs and hard_timeout_secs must be non-zero".into(),
                    ));
                }
                Ok(settings)
            })
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl GatewaySettings {
    /// Public domain name of the gateway, defaulted to `localhost:<port>`
    /// when not configured. `port` is the actually bound port so that
    /// OS-assigned ports resolve correctly.
    pub fn resolved_domain_name(&self, port: u16) -> String {
        if self.domain_name.is_empty() {
            format!("localhost:{}", port)
        } else {
            self.domain_name.clone()
        }
    }
}
