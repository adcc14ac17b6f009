//! WebSocket Session Handling
//!
//! Admission, per-socket read loops, and the live-session registry.

pub mod gateway;
pub mod handler;
pub mod messages;

pub use gateway::{ConnectedSession, Gateway};
pub use handler::ws_handler;
pub use messages::SessionCommand;
