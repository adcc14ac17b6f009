//! Infrastructure Layer
//!
//! Outbound HTTP delivery to backend integrations and per-session timeout
//! timers.

pub mod dispatcher;
pub mod timeout;

pub use dispatcher::{DispatchOutcome, IntegrationDispatcher};
pub use timeout::{SessionProbe, TimeoutController, TimeoutFired, TimeoutKind};
