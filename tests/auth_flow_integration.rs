//! End-to-end tests of the authentication routes through the full router.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{TestApp, SECRET};
use microshell_backend::auth::{
    models::{CredentialUpdate, TokenSubject},
    CredentialStore, JwtHandler,
};
use serde_json::json;

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new();

    let user = app.register("a@x.com", "alice", "secret1").await;
    assert_eq!(user["email"], "a@x.com");
    assert_eq!(user["username"], "alice");
    assert_eq!(user["is_active"], true);
    assert_eq!(user["is_verified"], false);
    assert_eq!(user["role"]["name"], "user");
    assert!(user.get("password_hash").is_none());

    let (status, tokens) = app.login("a@x.com", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens["token_type"], "bearer");
    assert_eq!(tokens["expires_in"], 1800);
    assert_ne!(tokens["access_token"], tokens["refresh_token"]);

    let access = tokens["access_token"].as_str().unwrap();
    let (status, me) = app.send("GET", "/api/auth/me", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user["id"]);
    assert!(!me["last_login"].is_null());
}

#[tokio::test]
async fn test_login_twice_issues_distinct_tokens() {
    let app = TestApp::new();
    app.register("a@x.com", "alice", "secret1").await;

    let first = app.access_token("a@x.com", "secret1").await;
    let second = app.access_token("a@x.com", "secret1").await;
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.register("a@x.com", "alice", "secret1").await;

    let (wrong_status, wrong_body) = app.login("a@x.com", "nope").await;
    let (unknown_status, unknown_body) = app.login("nobody@x.com", "secret1").await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["detail"], "Incorrect email or password");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_invalid_input() {
    let app = TestApp::new();
    app.register("a@x.com", "alice", "secret1").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "a@x.com", "username": "other", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already registered");

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "b@x.com", "username": "alice", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username already taken");

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "c@x.com", "username": "carol", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "password");

    // Nothing from the rejected attempts was persisted
    assert!(app.store.find_by_email("b@x.com").await.unwrap().is_none());
    assert!(app.store.find_by_email("c@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_flow() {
    let app = TestApp::new();
    app.register("a@x.com", "alice", "secret1").await;
    let (_, tokens) = app.login("a@x.com", "secret1").await;

    let (status, refreshed) = app
        .send(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": tokens["refresh_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(refreshed["access_token"], tokens["access_token"]);

    let new_access = refreshed["access_token"].as_str().unwrap();
    let (status, _) = app.send("GET", "/api/auth/me", Some(new_access), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_kinds_are_not_interchangeable() {
    let app = TestApp::new();
    app.register("a@x.com", "alice", "secret1").await;
    let (_, tokens) = app.login("a@x.com", "secret1").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": tokens["access_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid refresh token");

    let refresh = tokens["refresh_token"].as_str().unwrap();
    let (status, body) = app.send("GET", "/api/auth/me", Some(refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Could not validate credentials");
}

#[tokio::test]
async fn test_foreign_and_garbage_tokens_rejected() {
    let app = TestApp::new();
    let user = app.register("a@x.com", "alice", "secret1").await;
    let id = user["id"].as_i64().unwrap();
    let stored = app.store.find_by_id(id).await.unwrap().unwrap();

    let foreign = JwtHandler::new("another-secret", Duration::minutes(30), Duration::days(7))
        .unwrap()
        .issue_access(&TokenSubject::access(&stored))
        .unwrap();

    for token in [foreign.as_str(), "not-a-token"] {
        let (status, _) = app.send("GET", "/api/auth/me", Some(token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = app.send("GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_tokens_rejected() {
    let app = TestApp::new();
    let user = app.register("a@x.com", "alice", "secret1").await;
    let id = user["id"].as_i64().unwrap();
    let stored = app.store.find_by_id(id).await.unwrap().unwrap();

    let short_lived = JwtHandler::new(SECRET, Duration::seconds(2), Duration::seconds(2)).unwrap();
    let access = short_lived.issue_access(&TokenSubject::access(&stored)).unwrap();
    let refresh = short_lived.issue_refresh(&TokenSubject::refresh(&stored)).unwrap();

    // Same secret, so the token is accepted while still live
    let (status, _) = app.send("GET", "/api/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(3100)).await;

    let (status, _) = app.send("GET", "/api/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid refresh token");
}

#[tokio::test]
async fn test_deactivated_account_is_locked_out() {
    let app = TestApp::new();
    let user = app.register("a@x.com", "alice", "secret1").await;
    let id = user["id"].as_i64().unwrap();
    let (_, tokens) = app.login("a@x.com", "secret1").await;

    app.store
        .update_credential(
            id,
            CredentialUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let access = tokens["access_token"].as_str().unwrap();
    let (status, body) = app.send("GET", "/api/auth/me", Some(access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Inactive user");

    let (status, _) = app.login("a@x.com", "secret1").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": tokens["refresh_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    app.register("a@x.com", "alice", "secret1").await;
    let access = app.access_token("a@x.com", "secret1").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/change-password",
            Some(&access),
            Some(json!({ "current_password": "wrong1", "new_password": "secret2" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Incorrect current password");

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/change-password",
            Some(&access),
            Some(json!({ "current_password": "secret1", "new_password": "abc" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "new_password");

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/change-password",
            Some(&access),
            Some(json!({ "current_password": "secret1", "new_password": "secret2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password changed successfully");

    let (status, _) = app.login("a@x.com", "secret1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("a@x.com", "secret2").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_requires_token() {
    let app = TestApp::new();
    app.register("a@x.com", "alice", "secret1").await;
    let access = app.access_token("a@x.com", "secret1").await;

    let (status, _) = app.send("POST", "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send("POST", "/api/auth/logout", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out");
}

#[tokio::test]
async fn test_health_and_root() {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());
}
