//! Management API and Gateway Tests

mod connections_tests;
mod gateway_tests;
mod health_tests;
