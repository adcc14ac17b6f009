//! Management API Handlers

pub mod connections;
pub mod health;
