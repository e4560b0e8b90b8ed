//! MicroShell Backend Library
//!
//! Token-based session authentication with role-gated user management.
//! Exposes the modules used by the server binary and integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod middleware;
pub mod users;
