//! Authentication Module
//! Stateless JWT sessions, bcrypt credentials and role-gated authorization

pub mod api;
pub mod errors;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod user_store;
pub mod validation;

pub use errors::{AuthError, StoreError};
pub use jwt::{JwtHandler, TokenError};
pub use middleware::{auth_middleware, require_admin, CurrentUser};
pub use password::PasswordHasher;
pub use service::AuthService;
pub use user_store::{CredentialStore, UserStore};
