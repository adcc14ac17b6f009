//! Telemetry and Observability
//!
//! Structured logging setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the default filter depends on the
/// `verbose_logging` configuration flag.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "debug,gateway_emulator=trace"
    } else {
        "info,gateway_emulator=debug"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Tracing initialized");
}
