//! Authentication API Endpoints
//! Login, registration, token refresh and account self-service

use crate::auth::{
    errors::AuthError,
    middleware::CurrentUser,
    models::{
        LoginRequest, MessageResponse, PasswordChangeRequest, RefreshTokenRequest,
        RegisterRequest, TokenResponse, UserResponse,
    },
    service::AuthService,
};
use axum::{extract::State, Json};
use tracing::info;

/// Login endpoint - POST /api/auth/login
pub async fn login(
    State(auth): State<AuthService>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    info!("Login attempt: {}", payload.email);

    let tokens = auth.login(&payload.email, &payload.password).await?;
    Ok(Json(tokens))
}

/// Register endpoint - POST /api/auth/register
pub async fn register(
    State(auth): State<AuthService>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, AuthError> {
    let credential = auth.register(payload).await?;
    Ok(Json(UserResponse::from_credential(&credential)))
}

/// Refresh endpoint - POST /api/auth/refresh
pub async fn refresh_token(
    State(auth): State<AuthService>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let tokens = auth.refresh_token(&payload.refresh_token).await?;
    Ok(Json(tokens))
}

/// Current user info - GET /api/auth/me
pub async fn get_current_user(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_credential(&user))
}

/// Change password - POST /api/auth/change-password
pub async fn change_password(
    State(auth): State<AuthService>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<PasswordChangeRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    auth.change_password(&user, &payload.current_password, &payload.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// Logout - POST /api/auth/logout
///
/// Tokens are stateless; the client discards them.
pub async fn logout(CurrentUser(user): CurrentUser) -> Json<MessageResponse> {
    info!("Logout: {}", user.username);
    Json(MessageResponse::new("Successfully logged out"))
}
