//! Presentation Layer
//!
//! Management HTTP handlers and WebSocket session handling, multiplexed on
//! one listener.

pub mod http;
pub mod websocket;
