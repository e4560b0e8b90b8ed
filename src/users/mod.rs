//! User Management Module
//! Admin-only CRUD over accounts, layered on the auth store and role gate

pub mod api;
pub mod models;
pub mod service;

pub use service::UserService;
