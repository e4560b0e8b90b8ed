use axum::{
    middleware::{from_fn, from_fn_with_state},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::api::AppState;
use crate::auth::{api as auth_api, auth_middleware, require_admin};
use crate::middleware::request_logging;
use crate::users::api as users_api;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/auth/login", post(auth_api::login))
        .route("/api/auth/register", post(auth_api::register))
        .route("/api/auth/refresh", post(auth_api::refresh_token));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth_api::get_current_user))
        .route("/api/auth/change-password", post(auth_api::change_password))
        .route("/api/auth/logout", post(auth_api::logout))
        .route_layer(from_fn_with_state(state.auth.clone(), auth_middleware));

    // route_layer order: the auth middleware wraps (runs before) the admin gate
    let admin_routes = Router::new()
        .route(
            "/api/users",
            get(users_api::list_users).post(users_api::create_user),
        )
        .route("/api/users/roles", get(users_api::list_roles))
        .route(
            "/api/users/:id",
            get(users_api::get_user)
                .put(users_api::update_user)
                .delete(users_api::delete_user),
        )
        .route("/api/users/:id/activate", post(users_api::activate_user))
        .route("/api/users/:id/deactivate", post(users_api::deactivate_user))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.auth.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(from_fn(request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// API root with pointers to the rest of the surface
async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "MicroShell Backend API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        health: "/health".to_string(),
    })
}

// ===== Response Types =====

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct RootResponse {
    message: String,
    version: String,
    health: String,
}
