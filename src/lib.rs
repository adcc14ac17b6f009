//! # WebSocket Gateway Emulator
//!
//! A local emulator for a managed cloud WebSocket gateway.
//!
//! Clients open long-lived WebSocket sessions against a single listener;
//! every session event (connect, inbound message, disconnect) is forwarded
//! to a backend integration as an HTTP POST whose shape matches the cloud
//! service, and a management HTTP surface on the same port lets the backend
//! push data to a specific client or close it.
//!
//! ## Module Structure
//!
//! ```text
//! gateway_emulator/
//! +-- config/         Configuration management
//! +-- domain/         Session data, integration table, close causes
//! +-- application/    Event encoding and route selection
//! +-- infrastructure/ Backend dispatch and timeout timers
//! +-- presentation/   Management HTTP handlers and WebSocket sessions
//! +-- shared/         Common utilities (errors, identifiers)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core session model
pub mod domain;

// Application layer - Event shaping and routing
pub mod application;

// Infrastructure layer - Outbound HTTP and timers
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
