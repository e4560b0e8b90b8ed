//! Shared harness for router-level integration tests.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use microshell_backend::{
    api::{create_router, AppState},
    auth::{
        models::{Claims, CredentialUpdate, ADMIN_ROLE},
        password::MIN_COST,
        CredentialStore, JwtHandler, PasswordHasher, UserStore,
    },
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<UserStore>,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("auth.db");
        let store = Arc::new(UserStore::open(db_path.to_str().unwrap()).unwrap());
        let jwt = JwtHandler::new(SECRET, Duration::minutes(30), Duration::days(7));
        let jwt = Arc::new(jwt.unwrap());
        let state = AppState::new(store.clone(), PasswordHasher::new(MIN_COST), jwt).unwrap();

        Self {
            router: create_router(state),
            store,
            _dir: dir,
        }
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn register(&self, email: &str, username: &str, password: &str) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        body
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Log in and return the access token, panicking on failure.
    pub async fn access_token(&self, email: &str, password: &str) -> String {
        let (status, body) = self.login(email, password).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Decode a token issued by this app.
    pub fn claims(&self, token: &str) -> Claims {
        JwtHandler::new(SECRET, Duration::minutes(30), Duration::days(7))
            .unwrap()
            .decode(token)
            .unwrap()
    }

    /// Register an account and move it into the admin role.
    pub async fn admin(&self, email: &str, username: &str, password: &str) -> i64 {
        let user = self.register(email, username, password).await;
        let id = user["id"].as_i64().unwrap();

        let role = match self.store.find_role_by_name(ADMIN_ROLE).await.unwrap() {
            Some(role) => role,
            None => self
                .store
                .insert_role(ADMIN_ROLE, Some("Administrator"))
                .await
                .unwrap(),
        };
        self.store
            .update_credential(
                id,
                CredentialUpdate {
                    role_id: Some(role.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        id
    }
}
