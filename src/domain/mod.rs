//! Domain Layer
//!
//! Core session model: connect-time snapshots, close causes, and the
//! integration table.

pub mod integration;
pub mod session;

pub use integration::{IntegrationTable, ROUTE_CONNECT, ROUTE_DEFAULT, ROUTE_DISCONNECT};
pub use session::{CloseCause, ConnectionInfo};
