//! Authentication Middleware
//! Resolve bearer tokens to credentials and gate routes by role

use crate::auth::{
    errors::AuthError,
    models::{Credential, ADMIN_ROLE},
    service::AuthService,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

/// Credential resolved from the request's access token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Credential);

/// Auth middleware that resolves the bearer token to an active credential
pub async fn auth_middleware(
    State(auth): State<AuthService>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::Unauthenticated)?;

    let credential = auth.resolve_identity(bearer.token()).await?;

    // Handlers read the identity through the `CurrentUser` extractor
    req.extensions_mut().insert(CurrentUser(credential));

    Ok(next.run(req).await)
}

/// Admin gate. Must run inside `auth_middleware`.
pub async fn require_admin(
    CurrentUser(credential): CurrentUser,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    AuthService::require_role(&credential, ADMIN_ROLE)?;
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}
