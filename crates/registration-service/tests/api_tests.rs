//! Integration tests for the registration service API.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use registration_service::{
    api::{create_router, AppState, RequestLimiter, INIT_DATA_HEADER},
    auth::{AdminAuth, TokenIssuer},
    registry::{Registry, Store, UserRecord},
};
use secrecy::SecretString;
use std::time::Duration;
use telegram_init_data::InitDataVerifier;
use tower::ServiceExt;

const BOT_TOKEN: &str = "test_token";
const ADMIN_PASSWORD: &str = "hunter2";

fn test_state(registry: Registry, store: Store) -> AppState {
    let admin = AdminAuth::new(
        "admin",
        Some(SecretString::new(ADMIN_PASSWORD.into())),
        TokenIssuer::new(SecretString::new("token-secret".into()), Duration::from_secs(1800)),
    );
    AppState::new(registry, store, InitDataVerifier::new(BOT_TOKEN), admin)
}

/// Create a test app with memory-only storage.
fn create_test_app() -> Router {
    create_test_app_with_limiter(RequestLimiter::unlimited())
}

fn create_test_app_with_limiter(limiter: RequestLimiter) -> Router {
    create_router(test_state(Registry::new(), Store::memory()), limiter)
}

/// A store whose parent "directory" is a regular file, so every save fails.
fn unwritable_store(blocker: &tempfile::NamedTempFile) -> Store {
    Store::encrypted(
        blocker.path().join("registry.enc"),
        &SecretString::new("storage-secret".into()),
    )
}

fn init_data_for(telegram_id: u64) -> String {
    let user = format!(r#"{{"id":{telegram_id},"first_name":"Ada","username":"ada"}}"#);
    InitDataVerifier::new(BOT_TOKEN).sign(&[
        ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
        ("user", &user),
        ("auth_date", "1700000000"),
    ])
}

fn register_request(init_data: Option<&str>, telegram_id: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(init_data) = init_data {
        builder = builder.header(INIT_DATA_HEADER, init_data);
    }

    let body = serde_json::json!({
        "telegram_id": telegram_id,
        "name": "Ada Lovelace",
        "phone": "+15551234567",
    });
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    let body = serde_json::json!({ "username": username, "password": password });
    Request::builder()
        .method("POST")
        .uri("/admin/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn admin_token(app: &Router) -> String {
    let (status, json) = send(app, login_request("admin", ADMIN_PASSWORD)).await;
    assert_eq!(status, StatusCode::OK);
    json["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["registry_count"], 0);
}

#[tokio::test]
async fn test_register_and_poll_status() {
    let app = create_test_app();
    let init_data = init_data_for(42);

    let (status, json) = send(&app, register_request(Some(&init_data), "42")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Registration request sent successfully");

    let (status, json) = send(&app, get("/user/status/42", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn test_register_requires_init_data() {
    let app = create_test_app();

    let (status, json) = send(&app, register_request(None, "42")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Telegram Web App data is required");

    let (status, json) = send(&app, register_request(Some(""), "42")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "MISSING_INIT_DATA");
}

#[tokio::test]
async fn test_register_rejects_invalid_init_data_generically() {
    let app = create_test_app();
    let valid = init_data_for(42);

    let tampered = valid.replace("1700000000", "1700000001");
    let unsigned = "auth_date=1700000000&user=%7B%22id%22%3A42%7D".to_string();
    let wrong_bot = InitDataVerifier::new("other_token")
        .sign(&[("user", r#"{"id":42}"#), ("auth_date", "1700000000")]);

    // Tampered, unsigned, wrong bot and garbage all look the same to the client
    for init_data in [tampered, unsigned, wrong_bot, "garbage".to_string()] {
        let (status, json) = send(&app, register_request(Some(&init_data), "42")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid Telegram Web App data");
        assert_eq!(json["code"], "INVALID_INIT_DATA");
    }

    let (_, json) = send(&app, get("/health", None)).await;
    assert_eq!(json["registry_count"], 0);
}

#[tokio::test]
async fn test_register_rejects_id_mismatch() {
    let app = create_test_app();
    let init_data = init_data_for(42);

    let (status, json) = send(&app, register_request(Some(&init_data), "43")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Telegram ID mismatch");

    let (status, _) = send(&app, get("/user/status/43", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_register_without_user_is_invalid() {
    let app = create_test_app();
    let verifier = InitDataVerifier::new(BOT_TOKEN);

    // Correctly signed, but there is no identity to bind the request to
    for init_data in [
        verifier.sign(&[("auth_date", "1700000000")]),
        verifier.sign(&[("auth_date", "1700000000"), ("user", "{}")]),
    ] {
        let (status, json) = send(&app, register_request(Some(&init_data), "42")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_INIT_DATA");
        assert_eq!(json["error"], "Invalid Telegram Web App data");
    }

    let (_, json) = send(&app, get("/health", None)).await;
    assert_eq!(json["registry_count"], 0);
}

#[tokio::test]
async fn test_register_rolled_back_when_save_fails() {
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let app = create_router(
        test_state(Registry::new(), unwritable_store(&blocker)),
        RequestLimiter::unlimited(),
    );
    let init_data = init_data_for(42);

    let (status, json) = send(&app, register_request(Some(&init_data), "42")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "STORAGE_ERROR");

    let (status, _) = send(&app, get("/user/status/42", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A retry hits the same storage failure, not a phantom duplicate
    let (status, json) = send(&app, register_request(Some(&init_data), "42")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_ne!(json["error"], "User with this Telegram ID already exists");

    let (_, json) = send(&app, get("/health", None)).await;
    assert_eq!(json["registry_count"], 0);
}

#[tokio::test]
async fn test_status_change_rolled_back_when_save_fails() {
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let mut registry = Registry::new();
    registry
        .insert_one(UserRecord::new_pending(
            "42".into(),
            "Ada Lovelace".into(),
            "+15551234567".into(),
        ))
        .unwrap();
    let app = create_router(
        test_state(registry, unwritable_store(&blocker)),
        RequestLimiter::unlimited(),
    );
    let token = admin_token(&app).await;

    for uri in ["/admin/approve/42", "/admin/reject/42"] {
        let (status, _) = send(&app, post(uri, Some(&token))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (_, json) = send(&app, get("/user/status/42", None)).await;
        assert_eq!(json["status"], "pending");
    }

    // Still pending, so approving again is a change, not a 404
    let (status, _) = send(&app, post("/admin/approve/42", Some(&token))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, json) = send(&app, get("/admin/requests", Some(&token))).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_duplicate() {
    let app = create_test_app();
    let init_data = init_data_for(42);

    let (status, _) = send(&app, register_request(Some(&init_data), "42")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, register_request(Some(&init_data), "42")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "User with this Telegram ID already exists");
}

#[tokio::test]
async fn test_status_not_found() {
    let app = create_test_app();

    let (status, json) = send(&app, get("/user/status/999", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "User not found");
}

#[tokio::test]
async fn test_admin_login() {
    let app = create_test_app();

    let (status, json) = send(&app, login_request("admin", ADMIN_PASSWORD)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["token_type"], "bearer");
    assert!(json["access_token"].as_str().unwrap().split('.').count() == 3);

    let response = app
        .clone()
        .oneshot(login_request("admin", "wrong"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let (status, json) = send(&app, login_request("root", ADMIN_PASSWORD)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Incorrect username or password");
}

#[tokio::test]
async fn test_admin_endpoints_require_token() {
    let app = create_test_app();

    for request in [
        get("/admin/requests", None),
        get("/admin/requests", Some("not-a-token")),
        post("/admin/approve/42", None),
        post("/admin/reject/42", Some("a.b.c")),
    ] {
        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let app = create_test_app();
    let forged = TokenIssuer::new(SecretString::new("guess".into()), Duration::from_secs(60))
        .issue("admin")
        .unwrap();

    let (status, _) = send(&app, get("/admin/requests", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_approval_flow() {
    let app = create_test_app();
    for id in [42, 43] {
        let init_data = init_data_for(id);
        let (status, _) =
            send(&app, register_request(Some(&init_data), &id.to_string())).await;
        assert_eq!(status, StatusCode::OK);
    }

    let token = admin_token(&app).await;

    let (status, json) = send(&app, get("/admin/requests", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let pending = json.as_array().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0]["name"], "Ada Lovelace");
    assert_eq!(pending[0]["role"], "employee");
    assert_eq!(pending[0]["status"], "pending");

    let (status, json) = send(&app, post("/admin/approve/42", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "User approved successfully");

    let (status, json) = send(&app, post("/admin/reject/43", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "User rejected successfully");

    let (_, json) = send(&app, get("/user/status/42", None)).await;
    assert_eq!(json["status"], "approved");
    let (_, json) = send(&app, get("/user/status/43", None)).await;
    assert_eq!(json["status"], "rejected");

    let (_, json) = send(&app, get("/admin/requests", Some(&token))).await;
    assert!(json.as_array().unwrap().is_empty());

    // Nothing modified counts as not found
    let (status, _) = send(&app, post("/admin/approve/42", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A rejected request can still be approved
    let (status, _) = send(&app, post("/admin/approve/43", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_approve_unknown_user() {
    let app = create_test_app();
    let token = admin_token(&app).await;

    let (status, json) = send(&app, post("/admin/approve/999", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "User not found");

    let (status, _) = send(&app, post("/admin/reject/999", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limiting() {
    // One request per minute
    let app = create_test_app_with_limiter(RequestLimiter::per_minute(1));

    let (status, _) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "RATE_LIMIT_EXCEEDED");
}
