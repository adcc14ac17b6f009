//! Application Startup
//!
//! Application building, component wiring, and graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use crate::application::{EventEncoder, RouteSelector};
use crate::config::Settings;
use crate::domain::{CloseCause, IntegrationTable};
use crate::infrastructure::{
    IntegrationDispatcher, SessionProbe, TimeoutController, TimeoutFired, TimeoutKind,
};
use crate::presentation::http::routes;
use crate::presentation::websocket::Gateway;
use crate::shared::ConnectionIdGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub dispatcher: Arc<IntegrationDispatcher>,
    pub timeouts: Arc<TimeoutController>,
    pub selector: Arc<RouteSelector>,
    pub ids: Arc<ConnectionIdGenerator>,
    pub started: Instant,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let table = IntegrationTable::new(settings.integrations.clone())?;
        if table.is_empty() {
            tracing::warn!("No integrations configured; every event will be dropped");
        } else {
            tracing::info!(routes = table.len(), "Integration table loaded");
        }
        let selector = Arc::new(RouteSelector::from_expression(
            settings.gateway.route_selection_expression.as_deref(),
        )?);

        // Bind first so an OS-assigned port can flow into the domain name
        let listener = TcpListener::bind(settings.server_addr()).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Listening on {}", local_addr);

        let encoder = EventEncoder::new(
            settings.gateway.stage.clone(),
            settings.gateway.resolved_domain_name(local_addr.port()),
            settings.gateway.api_id.clone(),
        );
        let dispatcher = Arc::new(IntegrationDispatcher::new(
            table,
            settings.gateway.integration_mode,
            encoder,
        )?);

        let gateway = Arc::new(Gateway::new());

        // Timers may only be re-armed for sessions that are live and not
        // already closing
        let liveness: SessionProbe = {
            let gateway = gateway.clone();
            Arc::new(move |connection_id: &str| {
                gateway
                    .get(connection_id)
                    .map(|session| !session.is_closing())
                    .unwrap_or(false)
            })
        };
        let (timeouts, fired_rx) = TimeoutController::new(
            Duration::from_secs(settings.gateway.idle_timeout_secs),
            Duration::from_secs(settings.gateway.hard_timeout_secs),
            liveness,
        );
        spawn_timeout_reaper(gateway.clone(), fired_rx);

        let state = AppState {
            gateway,
            dispatcher,
            timeouts: Arc::new(timeouts),
            selector,
            ids: Arc::new(ConnectionIdGenerator::new()),
            started: Instant::now(),
        };

        let router = routes::create_router(state.clone()).layer(TraceLayer::new_for_http());

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the server until ctrl-c
    pub async fn run_until_stopped(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run the server until `signal` resolves, then shut down gracefully:
    /// close every live session with 1001, cancel all timers, stop the
    /// listener. No `$disconnect` events are delivered for shutdown
    /// closes. Stopping an already-stopping server is a no-op.
    pub async fn run_until(
        self,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let state = self.state.clone();
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            signal.await;
            tracing::info!("Shutdown signal received");
            let closed = state.gateway.close_all(CloseCause::Shutdown);
            state.timeouts.cancel_all();
            tracing::info!(sessions = closed, "Live sessions told to close");
        })
        .await?;

        tracing::info!("Listener stopped");
        Ok(())
    }
}

/// Turn timer firings into session closes.
///
/// The gateway checks liveness and closing state, so a firing that races a
/// client close or a reaped session is a no-op.
fn spawn_timeout_reaper(
    gateway: Arc<Gateway>,
    mut fired_rx: mpsc::UnboundedReceiver<TimeoutFired>,
) {
    tokio::spawn(async move {
        while let Some(fired) = fired_rx.recv().await {
            let cause = match fired.kind {
                TimeoutKind::Idle => CloseCause::IdleTimeout,
                TimeoutKind::Hard => CloseCause::HardTimeout,
            };
            if gateway.close(&fired.connection_id, cause) {
                tracing::info!(
                    connection_id = %fired.connection_id,
                    kind = ?fired.kind,
                    "Session timed out"
                );
            }
        }
    });
}

/// Resolve when the process receives ctrl-c
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
