//! User management endpoints - /api/users (Admin only)

use crate::auth::{
    errors::AuthError,
    middleware::CurrentUser,
    models::{MessageResponse, Role, UserResponse},
};
use crate::users::{
    models::{UserCreate, UserListQuery, UserListResponse, UserUpdate},
    service::UserService,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};

/// List users - GET /api/users
pub async fn list_users(
    State(users): State<UserService>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, AuthError> {
    Ok(Json(users.list_users(&query).await?))
}

/// Get user - GET /api/users/:id
pub async fn get_user(
    State(users): State<UserService>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = users.get_user(user_id).await?;
    Ok(Json(UserResponse::from_credential(&user)))
}

/// Create user - POST /api/users
pub async fn create_user(
    State(users): State<UserService>,
    Json(payload): Json<UserCreate>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = users.create_user(payload).await?;
    Ok(Json(UserResponse::from_credential(&user)))
}

/// Update user - PUT /api/users/:id
pub async fn update_user(
    State(users): State<UserService>,
    Path(user_id): Path<i64>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = users.update_user(user_id, payload).await?;
    Ok(Json(UserResponse::from_credential(&user)))
}

/// Delete user - DELETE /api/users/:id
pub async fn delete_user(
    State(users): State<UserService>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Json<MessageResponse>, AuthError> {
    users.delete_user(&actor, user_id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// Activate user - POST /api/users/:id/activate
pub async fn activate_user(
    State(users): State<UserService>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Json<MessageResponse>, AuthError> {
    users.set_active(&actor, user_id, true).await?;
    Ok(Json(MessageResponse::new("User activated successfully")))
}

/// Deactivate user - POST /api/users/:id/deactivate
pub async fn deactivate_user(
    State(users): State<UserService>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Json<MessageResponse>, AuthError> {
    users.set_active(&actor, user_id, false).await?;
    Ok(Json(MessageResponse::new("User deactivated successfully")))
}

/// List roles - GET /api/users/roles
pub async fn list_roles(State(users): State<UserService>) -> Result<Json<Vec<Role>>, AuthError> {
    Ok(Json(users.list_roles().await?))
}
