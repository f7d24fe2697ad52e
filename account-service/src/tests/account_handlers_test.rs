use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use mockito::Matcher;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::routes::create_router_with_store;
use gather_shared::auth::verify_token;
use gather_shared::config::{MailProvider, MailSettings};
use gather_shared::mailer::Mailer;
use gather_shared::test_utils::http_test_utils::response_to_json;
use gather_shared::test_utils::mock_store::MockStore;
use gather_shared::test_utils::test_logging::init_test_logging;

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "correct horse battery";

fn log_mailer() -> Mailer {
    Mailer::new(MailSettings {
        provider: MailProvider::Log,
        from: None,
        sendgrid_api_key: None,
        sendgrid_url: String::new(),
        debug_fallback: true,
    })
}

fn create_test_app_with_mailer(mailer: Mailer) -> (Router, Arc<MockStore>) {
    init_test_logging();
    let store = Arc::new(MockStore::new());
    let app = create_router_with_store(store.clone(), Arc::new(mailer), "");
    (app, store)
}

fn create_test_app() -> (Router, Arc<MockStore>) {
    create_test_app_with_mailer(log_mailer())
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, response_to_json(response).await)
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    let form = format!(
        "grant_type=password&username={}&password={}",
        username.replace('@', "%40"),
        password.replace(' ', "+")
    );
    let request = Request::builder()
        .method("POST")
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, response_to_json(response).await)
}

async fn sign_up(app: &Router) -> Value {
    let (status, body) = post_json(
        app,
        "/signup",
        json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": EMAIL,
            "password": PASSWORD,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
    body
}

#[tokio::test]
async fn test_signup_returns_public_user() {
    let (app, _store) = create_test_app();

    let body = sign_up(&app).await;

    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["email"], EMAIL);
    assert_eq!(body["user"]["first_name"], "Ada");
    assert!(body["user"]["id"].as_str().is_some());
    assert!(body["user"].get("hashed_password").is_none());
}

#[tokio::test]
async fn test_duplicate_signup_is_rejected() {
    let (app, _store) = create_test_app();
    sign_up(&app).await;

    let (status, body) = post_json(
        &app,
        "/signup",
        json!({ "first_name": "Ada", "email": "ADA@example.com", "password": PASSWORD }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already registered");
}

#[tokio::test]
async fn test_signup_validates_input() {
    let (app, _store) = create_test_app();

    let (status, _body) = post_json(
        &app,
        "/signup",
        json!({ "first_name": "Ada", "email": "not-an-email", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _body) = post_json(
        &app,
        "/signup",
        json!({ "first_name": "Ada", "email": EMAIL, "password": "short" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_issues_bearer_token() {
    let (app, _store) = create_test_app();
    sign_up(&app).await;

    let (status, body) = login(&app, EMAIL, PASSWORD).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    let claims = verify_token(body["access_token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.sub, EMAIL);
}

#[tokio::test]
async fn test_login_with_bad_credentials_is_unauthorized() {
    let (app, _store) = create_test_app();
    sign_up(&app).await;

    let (status, body) = login(&app, EMAIL, "wrong password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, _body) = login(&app, "nobody@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_reset_does_not_reveal_accounts() {
    let (app, store) = create_test_app();
    sign_up(&app).await;

    let (known_status, known) = post_json(&app, "/request-reset", json!({ "email": EMAIL })).await;
    let (unknown_status, unknown) =
        post_json(&app, "/request-reset", json!({ "email": "nobody@example.com" })).await;

    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(unknown_status, StatusCode::OK);
    assert_eq!(known, unknown);
    assert!(store.reset_token_for(EMAIL).is_some());
    assert!(store.reset_token_for("nobody@example.com").is_none());
}

#[tokio::test]
async fn test_reset_sets_password_and_consumes_token() {
    let (app, store) = create_test_app();
    sign_up(&app).await;
    post_json(&app, "/request-reset", json!({ "email": EMAIL })).await;
    let token = store.reset_token_for(EMAIL).unwrap();

    let new_password = "a brand new secret";
    let (status, _body) = post_json(
        &app,
        "/reset",
        json!({ "token": token, "new_password": new_password }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _body) = login(&app, EMAIL, new_password).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _body) = login(&app, EMAIL, PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Tokens are single use
    let (status, body) = post_json(
        &app,
        "/reset",
        json!({ "token": token, "new_password": "yet another secret" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_token");
}

#[tokio::test]
async fn test_reset_with_unknown_token_is_rejected() {
    let (app, _store) = create_test_app();

    let (status, body) = post_json(
        &app,
        "/reset",
        json!({ "token": "made-up", "new_password": "long enough password" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_token");
}

#[tokio::test]
async fn test_reset_email_goes_through_sendgrid() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/mail/send")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::Regex("Password Reset Instructions".to_string()))
        .with_status(202)
        .create_async()
        .await;

    let mailer = Mailer::new(MailSettings {
        provider: MailProvider::SendGrid,
        from: Some("Gather <noreply@gather.test>".to_string()),
        sendgrid_api_key: Some("test-key".to_string()),
        sendgrid_url: format!("{}/v3/mail/send", server.url()),
        debug_fallback: false,
    });
    let (app, _store) = create_test_app_with_mailer(mailer);
    sign_up(&app).await;

    let (status, _body) = post_json(&app, "/request-reset", json!({ "email": EMAIL })).await;

    assert_eq!(status, StatusCode::OK);
    mock.assert_async().await;
}
