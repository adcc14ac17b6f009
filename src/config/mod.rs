//! Configuration Management
//!
//! Settings loading from environment variables and config files.

pub mod settings;

pub use settings::{GatewaySettings, IntegrationMode, ServerSettings, Settings};
