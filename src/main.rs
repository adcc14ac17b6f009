//! # Gateway Emulator
//!
//! Local emulator for a managed cloud WebSocket gateway.
//!
//! This is the application entry point that initializes:
//! - Configuration loading
//! - Tracing/logging subsystem
//! - The shared HTTP/WebSocket listener

use anyhow::Result;
use tracing::info;

use gateway_emulator::config::Settings;
use gateway_emulator::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment and config files
    let settings = Settings::load()?;

    // Initialize tracing subscriber for structured logging
    gateway_emulator::telemetry::init_tracing(settings.verbose_logging);

    info!("Starting WebSocket gateway emulator...");
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        stage = %settings.gateway.stage,
        routes = settings.integrations.len(),
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Gateway ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
