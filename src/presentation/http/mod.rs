//! Management HTTP Surface
//!
//! Routes and handlers for the backend-facing management API.

pub mod handlers;
pub mod routes;
