//! End-to-end tests of the REST router, driven in-process with `tower::ServiceExt::oneshot`.

use api_rest::{router, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use std::sync::Arc;
use telehealth_core::{AccountService, CoreConfig, InMemoryAccountStore};
use tempfile::TempDir;
use tower::ServiceExt;

const SECRET: &str = "0123456789abcdef0123456789abcdef";

fn app() -> Router {
    let cfg = Arc::new(
        CoreConfig::new("unused".into(), SECRET, Duration::hours(1), 2)
            .expect("config should be valid"),
    );
    let accounts = AccountService::new(cfg, Arc::new(InMemoryAccountStore::new()));
    router(AppState::new(accounts))
}

async fn send(
    app: &Router,
    method: Method,
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

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn register(app: &Router, username: &str, role: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "name": format!("{username} name"),
            "email": format!("{username}@example.com"),
            "password": "secret1",
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_register_returns_token_and_user_without_password() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "username": "jdoe",
            "name": "Jane Doe",
            "email": "Jane@Example.com",
            "password": "secret1",
            "role": "patient",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].as_str().is_some_and(|t| t.split('.').count() == 3));
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert_eq!(body["user"]["role"], "patient");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_register_conflicts_and_bad_input() {
    let app = app();
    register(&app, "jdoe", "patient").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "username": "jdoe",
            "name": "Other",
            "email": "other@example.com",
            "password": "secret1",
            "role": "doctor",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "username": "admin",
            "name": "Admin",
            "email": "admin@example.com",
            "password": "secret1",
            "role": "admin",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = app();
    register(&app, "jdoe", "patient").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "jdoe", "password": "wrong-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "jdoe", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "jdoe");
}

#[tokio::test]
async fn test_missing_and_bad_tokens_are_rejected_identically() {
    let app = app();

    let (status, missing) = send(&app, Method::GET, "/api/users/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, garbage) = send(
        &app,
        Method::GET,
        "/api/users/profile",
        Some("not.a.token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing, garbage);
    assert_eq!(missing["message"], "Authentication required");
}

#[tokio::test]
async fn test_profile_update_with_role_key_is_rejected() {
    let app = app();
    let token = register(&app, "jdoe", "patient").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users/profile",
        Some(&token),
        Some(json!({"role": "doctor"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid updates");

    let (_, profile) = send(&app, Method::GET, "/api/users/profile", Some(&token), None).await;
    assert_eq!(profile["role"], "patient");
}

#[tokio::test]
async fn test_profile_update_changes_submitted_fields() {
    let app = app();
    let token = register(&app, "jdoe", "patient").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users/profile",
        Some(&token),
        Some(json!({
            "phone": "555-0100",
            "dob": "1990-01-15",
            "emergencyContact": {"name": "John Doe", "phone": "555-0199"}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["phone"], "555-0100");
    assert_eq!(body["dob"], "1990-01-15");
    assert_eq!(body["emergencyContact"]["name"], "John Doe");
    assert_eq!(body["name"], "jdoe name");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_malformed_json_is_a_message_body() {
    let app = app();
    let token = register(&app, "jdoe", "patient").await;

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/users/profile")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_privacy_settings_partial_update() {
    let app = app();
    let token = register(&app, "jdoe", "patient").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users/privacy-settings",
        Some(&token),
        Some(json!({"shareData": false})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"shareData": false, "emailNotifications": true, "smsNotifications": true})
    );
}

#[tokio::test]
async fn test_medical_history_requires_patient_role() {
    let app = app();
    let doctor = register(&app, "drwho", "doctor").await;
    let patient = register(&app, "jdoe", "patient").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users/medical-history",
        Some(&doctor),
        Some(json!({"allergies": ["penicillin"]})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users/medical-history",
        Some(&patient),
        Some(json!({"allergies": ["penicillin"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allergies"], json!(["penicillin"]));
    assert_eq!(body["medications"], json!([]));
}

#[tokio::test]
async fn test_change_password() {
    let app = app();
    let token = register(&app, "jdoe", "patient").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users/change-password",
        Some(&token),
        Some(json!({"currentPassword": "nope-nope", "newPassword": "newsecret"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Current password is incorrect");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users/change-password",
        Some(&token),
        Some(json!({"currentPassword": "secret1", "newPassword": "newsecret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password updated successfully");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "jdoe", "password": "newsecret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deleted_account_token_is_unauthenticated() {
    let app = app();
    let token = register(&app, "jdoe", "patient").await;

    let (status, body) = send(&app, Method::DELETE, "/api/users/account", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Account deleted successfully");

    let (status, _) = send(&app, Method::GET, "/api/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::DELETE, "/api/users/account", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/api/users/profile").is_some());
    assert!(body["paths"].get("/api/users/medical-history").is_some());
}

#[tokio::test]
async fn test_file_backed_router_persists_updates() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let cfg = Arc::new(
        CoreConfig::new(temp_dir.path().to_path_buf(), SECRET, Duration::hours(1), 2)
            .expect("config should be valid"),
    );

    let first = router(AppState::from_config(cfg.clone()));
    let token = register(&first, "jdoe", "patient").await;
    let (status, _) = send(
        &first,
        Method::PUT,
        "/api/users/profile",
        Some(&token),
        Some(json!({"address": "1 Main St"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let second = router(AppState::from_config(cfg));
    let (status, body) = send(&second, Method::GET, "/api/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address"], "1 Main St");
}
