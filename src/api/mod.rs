pub mod routes;

pub use routes::create_router;

use crate::auth::{AuthService, CredentialStore, JwtHandler, PasswordHasher};
use crate::users::UserService;
use axum::extract::FromRef;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub users: UserService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        jwt: Arc<JwtHandler>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            auth: AuthService::new(store.clone(), hasher, jwt)?,
            users: UserService::new(store, hasher),
        })
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}
