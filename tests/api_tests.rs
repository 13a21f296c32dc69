use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use decision_tracker::api::AppState;
use decision_tracker::config::Config;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const PASSWORD: &str = "Tr1cky-Horse-42";

async fn spawn_app() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // Cheapest Argon2 settings the crate accepts.
    config.security.argon2_memory_cost_kib = 8;
    config.security.argon2_time_cost = 1;

    let state = decision_tracker::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    (decision_tracker::api::router(state.clone()).await, state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn registration(username: &str) -> Value {
    json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": PASSWORD,
        "confirm_password": PASSWORD,
    })
}

#[tokio::test]
async fn test_register_returns_token_and_user() {
    let (app, _) = spawn_app().await;

    let (status, body) = send(
        &app,
        post_json("/authentication/register", &registration("testuser")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["auth_token"].as_str().unwrap().len(), 40);
    assert_eq!(body["user"]["username"], "testuser");
    assert_eq!(body["user"]["email"], "testuser@example.com");
    assert_eq!(body["user"]["is_superuser"], false);
    assert!(body["user"]["id"].is_number());
    assert!(body["user"]["date_joined"].is_string());
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());
    assert!(!body.to_string().contains(PASSWORD));
}

#[tokio::test]
async fn test_register_admin_flag() {
    let (app, state) = spawn_app().await;

    let mut request = registration("boss");
    request["admin"] = json!(true);
    let (status, body) = send(&app, post_json("/authentication/register", &request)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["is_superuser"], true);

    let user = state
        .store()
        .get_user_by_username("boss")
        .await
        .unwrap()
        .unwrap();
    assert!(user.is_staff);
}

#[tokio::test]
async fn test_register_password_mismatch_creates_nothing() {
    let (app, state) = spawn_app().await;

    let mut request = registration("testuser");
    request["confirm_password"] = json!("Different-Pass-99");
    let (status, body) = send(&app, post_json("/authentication/register", &request)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(
        body["fields"]["non_field_errors"][0],
        "Those passwords don't match."
    );
    assert!(!state.store().username_exists("testuser").await.unwrap());
}

#[tokio::test]
async fn test_register_duplicate_username_and_email() {
    let (app, _) = spawn_app().await;

    let (status, _) = send(
        &app,
        post_json("/authentication/register", &registration("testuser")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        post_json("/authentication/register", &registration("testuser")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["username"].is_array());
    assert!(body["fields"]["email"].is_array());

    let mut request = registration("someoneelse");
    request["email"] = json!("testuser@example.com");
    let (status, body) = send(&app, post_json("/authentication/register", &request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["email"][0], "This field must be unique.");
    assert!(body["fields"].get("username").is_none());
}

#[tokio::test]
async fn test_register_reports_missing_fields() {
    let (app, _) = spawn_app().await;

    let (status, body) = send(&app, post_json("/authentication/register", &json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["username", "email", "password", "confirm_password"] {
        assert_eq!(body["fields"][field][0], "This field is required.", "{field}");
    }
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let (app, _) = spawn_app().await;

    let request = json!({
        "username": "testuser",
        "email": "testuser@example.com",
        "password": "12345",
        "confirm_password": "12345",
    });
    let (status, body) = send(&app, post_json("/authentication/register", &request)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let messages = body["fields"]["password"].as_array().unwrap();
    assert!(messages.iter().any(|m| m.as_str().unwrap().contains("too short")));
    assert!(messages.iter().any(|m| m.as_str().unwrap().contains("entirely numeric")));
}

#[tokio::test]
async fn test_register_rejects_malformed_json() {
    let (app, _) = spawn_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/authentication/register")
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_login_returns_same_token() {
    let (app, _) = spawn_app().await;

    let (_, registered) = send(
        &app,
        post_json("/authentication/register", &registration("testuser")),
    )
    .await;

    let credentials = json!({"username": "testuser", "password": PASSWORD});
    let (status, first) = send(&app, post_json("/authentication/login", &credentials)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = send(&app, post_json("/authentication/login", &credentials)).await;

    assert_eq!(first["auth_token"], registered["auth_token"]);
    assert_eq!(first["auth_token"], second["auth_token"]);
    assert_eq!(first["user"]["username"], "testuser");
    assert!(!first.to_string().contains(PASSWORD));
}

#[tokio::test]
async fn test_login_with_bad_credentials() {
    let (app, _) = spawn_app().await;

    send(
        &app,
        post_json("/authentication/register", &registration("testuser")),
    )
    .await;

    for credentials in [
        json!({"username": "testuser", "password": "wrong-password"}),
        json!({"username": "nobody", "password": PASSWORD}),
    ] {
        let (status, body) = send(&app, post_json("/authentication/login", &credentials)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["fields"]["non_field_errors"][0],
            "Unable to login with provided credentials."
        );
    }

    let (status, body) = send(&app, post_json("/authentication/login", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["username"].is_array());
    assert!(body["fields"]["password"].is_array());
}

#[tokio::test]
async fn test_disabled_account_cannot_login() {
    let (app, state) = spawn_app().await;

    let (_, registered) = send(
        &app,
        post_json("/authentication/register", &registration("testuser")),
    )
    .await;
    state
        .store()
        .set_user_active("testuser", false)
        .await
        .unwrap();

    let credentials = json!({"username": "testuser", "password": PASSWORD});
    let (status, body) = send(&app, post_json("/authentication/login", &credentials)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["fields"]["non_field_errors"][0],
        "User account is disabled."
    );

    // The old token stops working too.
    let token = registered["auth_token"].as_str().unwrap();
    let request = Request::builder()
        .uri("/decisions")
        .header(header::AUTHORIZATION, format!("Token {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_is_rejected_even_on_reads() {
    let (app, _) = spawn_app().await;

    let request = Request::builder()
        .uri("/decisions")
        .header(header::AUTHORIZATION, "Token not-a-real-token")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token.");

    // Unknown schemes leave the caller anonymous.
    let request = Request::builder()
        .uri("/decisions")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bearer_keyword_is_accepted() {
    let (app, _) = spawn_app().await;

    let (_, registered) = send(
        &app,
        post_json("/authentication/register", &registration("testuser")),
    )
    .await;
    let token = registered["auth_token"].as_str().unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/decisions")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(
            json!({"title": "T", "description": "D", "measurable_goal": "G"}).to_string(),
        ))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let (app, _) = spawn_app().await;

    let (status, body) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);

    // No recorder is installed in tests.
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
