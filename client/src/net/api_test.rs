use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde_json::json;

use super::*;

#[test]
fn join_url_handles_trailing_and_leading_slashes() {
    assert_eq!(join_url("http://api.local/", "/articles"), "http://api.local/articles");
    assert_eq!(join_url("http://api.local", "articles"), "http://api.local/articles");
    assert_eq!(join_url("http://api.local/v1/", "/auth/login"), "http://api.local/v1/auth/login");
}

#[test]
fn article_endpoint_formats_expected_path() {
    assert_eq!(article_endpoint(42), "/articles/42");
}

#[test]
fn new_client_trims_base_url_and_has_no_token() {
    let client = ApiClient::new("http://localhost:3001/");
    assert_eq!(client.base_url(), "http://localhost:3001");
    assert!(!client.has_token());
}

#[test]
fn token_can_be_attached_and_cleared() {
    let mut client = ApiClient::new("http://localhost:3001").with_token("tok");
    assert!(client.has_token());
    client.set_token(None);
    assert!(!client.has_token());
}

// =============================================================================
// Against a local backend
// =============================================================================

type SeenAuth = Arc<Mutex<Vec<Option<String>>>>;

fn record(seen: &SeenAuth, headers: &HeaderMap) {
    let value = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_owned);
    seen.lock().unwrap().push(value);
}

fn user_json() -> serde_json::Value {
    json!({ "id": 1, "username": "alice", "email": "alice@example.com", "role": "admin" })
}

async fn login_handler(axum::Json(form): axum::Json<serde_json::Value>) -> axum::response::Response {
    match form["usernameOrEmail"].as_str() {
        Some("alice") => axum::Json(json!({
            "message": "ok",
            "user": user_json(),
            "access_token": "tok-alice",
        }))
        .into_response(),
        Some("garbled") => (StatusCode::OK, "{\"user\": 3}").into_response(),
        Some("") => (StatusCode::BAD_REQUEST, axum::Json(json!({ "message": ["usernameOrEmail should not be empty"] })))
            .into_response(),
        Some("flaky") => (StatusCode::SERVICE_UNAVAILABLE, axum::Json(json!({ "message": "maintenance window" })))
            .into_response(),
        _ => (StatusCode::UNAUTHORIZED, axum::Json(json!({ "message": "Unauthorized" }))).into_response(),
    }
}

async fn article_handler(
    State(seen): State<SeenAuth>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> axum::response::Response {
    record(&seen, &headers);
    match id {
        7 => (StatusCode::OK, "not json").into_response(),
        _ => (StatusCode::NOT_FOUND, axum::Json(json!({ "message": "Article not found" }))).into_response(),
    }
}

async fn delete_handler(State(seen): State<SeenAuth>, headers: HeaderMap, Path(id): Path<i64>) -> StatusCode {
    record(&seen, &headers);
    match (headers.contains_key(header::AUTHORIZATION), id) {
        (false, _) => StatusCode::UNAUTHORIZED,
        (true, 1) => StatusCode::NO_CONTENT,
        (true, _) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn categories_handler(State(seen): State<SeenAuth>, headers: HeaderMap) -> axum::Json<serde_json::Value> {
    record(&seen, &headers);
    axum::Json(json!([{ "id": 1, "name": "Rust", "slug": "rust" }]))
}

/// Serve a fake backend on an ephemeral port and return its base URL.
async fn spawn_backend() -> (String, SeenAuth) {
    let seen: SeenAuth = Arc::default();
    let app = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/articles/{id}", get(article_handler).delete(delete_handler))
        .route("/categories", get(categories_handler))
        .with_state(Arc::clone(&seen));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

fn form(username_or_email: &str) -> LoginForm {
    LoginForm { username_or_email: username_or_email.to_owned(), password: "pw".to_owned() }
}

#[tokio::test]
async fn authenticate_returns_token_and_user() {
    let (base, _) = spawn_backend().await;
    let resp = ApiClient::new(&base).authenticate(&form("alice")).await.unwrap();
    assert_eq!(resp.access_token, "tok-alice");
    assert_eq!(resp.user.username, "alice");
    assert!(resp.user.is_admin());
}

#[tokio::test]
async fn authenticate_maps_rejections_to_form_errors() {
    let (base, _) = spawn_backend().await;
    let client = ApiClient::new(&base);

    let cases = [
        ("mallory", "Invalid username or password"),
        ("", "Malformed request, check your input"),
        ("flaky", "maintenance window"),
        ("garbled", LOGIN_RETRY_MESSAGE),
    ];
    for (who, message) in cases {
        let err = client.authenticate(&form(who)).await.unwrap_err();
        assert_eq!(err, LoginError::FormError { message: message.to_owned() }, "login as {who:?}");
    }
}

#[tokio::test]
async fn authenticate_reports_unreachable_backend_as_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = ApiClient::new(&format!("http://{addr}")).authenticate(&form("alice")).await.unwrap_err();
    assert!(matches!(err, LoginError::Network(_)));
}

#[tokio::test]
async fn bearer_token_is_attached_only_when_present() {
    let (base, seen) = spawn_backend().await;

    ApiClient::new(&base).list_categories().await.unwrap();
    let categories = ApiClient::new(&base).with_token("tok-alice").list_categories().await.unwrap();

    assert_eq!(categories.len(), 1);
    assert_eq!(*seen.lock().unwrap(), vec![None, Some("Bearer tok-alice".to_owned())]);
}

#[tokio::test]
async fn get_article_maps_missing_and_malformed_responses() {
    let (base, _) = spawn_backend().await;
    let client = ApiClient::new(&base);

    assert!(matches!(client.get_article(404).await, Err(ApiError::NotFound)));
    assert!(matches!(client.get_article(7).await, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn delete_article_maps_status_codes() {
    let (base, seen) = spawn_backend().await;

    let anonymous = ApiClient::new(&base).delete_article(1).await.unwrap_err();
    assert!(anonymous.is_unauthorized());

    let client = ApiClient::new(&base).with_token("tok-alice");
    client.delete_article(1).await.unwrap();
    match client.delete_article(2).await {
        Err(ApiError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "request failed with status 500");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(seen.lock().unwrap()[1].as_deref(), Some("Bearer tok-alice"));
}
