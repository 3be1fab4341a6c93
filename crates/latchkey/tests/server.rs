//! Integration tests for the HTTP routes, driven through the router
//! without a socket.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use latchkey::prelude::*;
use latchkey_session::{Session, SessionError, SessionToken, UserId};
use serde_json::{Value, json};
use tower::ServiceExt;

// =========================================================================
// Helpers
// =========================================================================

const FORM: &str = "application/x-www-form-urlencoded";

async fn app_with(config: SessionConfig) -> (Router, AccountStore) {
    let accounts = AccountStore::with_cost(4);
    accounts.register("a@b.com", "pw").await.unwrap();
    let state = AppState::new(MemoryStore::new(), accounts.clone(), config);
    (router(state), accounts)
}

async fn app() -> Router {
    app_with(SessionConfig::default()).await.0
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn form(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, FORM)
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn with_cookie(method: Method, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// The `name=value` pair of the first `Set-Cookie` for `name`.
fn session_cookie(headers: &HeaderMap, name: &str) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_owned())
        .find(|v| v.starts_with(&format!("{name}=")))
        .and_then(|v| v.split(';').next().map(str::to_owned))
        .unwrap()
}

async fn login(app: &Router) -> String {
    let (status, headers, _) = send(
        app,
        form(Method::POST, "/sessions", "email=a%40b.com&password=pw"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    session_cookie(&headers, "_my_session_id")
}

// =========================================================================
// Login
// =========================================================================

#[tokio::test]
async fn test_login_without_email_returns_400() {
    let app = app().await;

    let (status, _, body) =
        send(&app, form(Method::POST, "/sessions", "password=pw")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "email missing" }));
}

#[tokio::test]
async fn test_login_without_form_body_returns_email_missing() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/sessions")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "email missing" }));
}

#[tokio::test]
async fn test_login_without_password_returns_400() {
    let app = app().await;

    let (status, _, body) =
        send(&app, form(Method::POST, "/sessions", "email=a%40b.com")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "password missing" }));
}

#[tokio::test]
async fn test_login_unknown_email_returns_404() {
    let app = app().await;

    let (status, _, body) = send(
        &app,
        form(Method::POST, "/sessions", "email=x%40y.com&password=pw"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "no user found for this email" }));
}

#[tokio::test]
async fn test_login_wrong_password_returns_401() {
    let app = app().await;

    let (status, headers, body) = send(
        &app,
        form(Method::POST, "/sessions", "email=a%40b.com&password=nope"),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "wrong password" }));
    assert!(headers.get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_login_success_sets_http_only_cookie_and_returns_user() {
    let app = app().await;

    let (status, headers, body) = send(
        &app,
        form(Method::POST, "/sessions", "email=a%40b.com&password=pw"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@b.com");
    assert!(body.get("password_hash").is_none());

    let raw = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(raw.starts_with("_my_session_id="));
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("Path=/"));

    let cookie = session_cookie(&headers, "_my_session_id");
    let token = cookie.trim_start_matches("_my_session_id=");
    assert!(SessionToken::parse(token).is_ok());
}

#[tokio::test]
async fn test_versioned_login_route_behaves_like_sessions() {
    let app = app().await;

    let (status, headers, _) = send(
        &app,
        form(
            Method::POST,
            "/api/v1/auth_session/login",
            "email=a%40b.com&password=pw",
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let cookie = session_cookie(&headers, "_my_session_id");
    let (status, _, body) =
        send(&app, with_cookie(Method::GET, "/users/me", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@b.com");
}

// =========================================================================
// Logout and the current user
// =========================================================================

#[tokio::test]
async fn test_full_login_me_logout_flow() {
    let app = app().await;
    let cookie = login(&app).await;

    let (status, _, body) =
        send(&app, with_cookie(Method::GET, "/users/me", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@b.com");

    let (status, headers, body) =
        send(&app, with_cookie(Method::DELETE, "/sessions", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
    assert!(headers.get(SET_COOKIE).is_some());

    let (status, _, body) =
        send(&app, with_cookie(Method::DELETE, "/sessions", &cookie)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not found" }));

    let (status, _, body) =
        send(&app, with_cookie(Method::GET, "/users/me", &cookie)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Forbidden" }));
}

#[tokio::test]
async fn test_session_cookie_next_to_malformed_pair_still_authenticates() {
    let app = app().await;
    let cookie = login(&app).await;
    let header = format!("flag; {cookie}; theme=dark");

    let (status, _, body) =
        send(&app, with_cookie(Method::GET, "/users/me", &header)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@b.com");

    let (status, _, _) =
        send(&app, with_cookie(Method::DELETE, "/sessions", &header)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_without_cookie_returns_404() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/v1/auth_session/logout")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not found" }));
}

#[tokio::test]
async fn test_logout_with_forged_cookie_returns_404() {
    let app = app().await;

    let (status, _, _) = send(
        &app,
        with_cookie(Method::DELETE, "/sessions", "_my_session_id=not-a-token"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_me_without_cookie_returns_403() {
    let app = app().await;
    let request = Request::builder()
        .uri("/users/me")
        .body(Body::empty())
        .unwrap();

    let (status, _, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_custom_cookie_name_is_used_and_default_ignored() {
    let (app, _) = app_with(SessionConfig {
        cookie_name: "sid".into(),
        ..SessionConfig::default()
    })
    .await;

    let (_, headers, _) = send(
        &app,
        form(Method::POST, "/sessions", "email=a%40b.com&password=pw"),
    )
    .await;
    let cookie = session_cookie(&headers, "sid");
    let token = cookie.trim_start_matches("sid=");

    let (status, _, _) = send(
        &app,
        with_cookie(
            Method::GET,
            "/users/me",
            &format!("_my_session_id={token}"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) =
        send(&app, with_cookie(Method::GET, "/users/me", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_single_policy_second_login_logs_out_first() {
    let (app, _) = app_with(SessionConfig {
        policy: SessionPolicy::Single,
        ..SessionConfig::default()
    })
    .await;

    let first = login(&app).await;
    let second = login(&app).await;

    let (status, _, _) =
        send(&app, with_cookie(Method::GET, "/users/me", &first)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) =
        send(&app, with_cookie(Method::GET, "/users/me", &second)).await;
    assert_eq!(status, StatusCode::OK);
}

// =========================================================================
// Registration and misc
// =========================================================================

#[tokio::test]
async fn test_register_then_login_with_new_account() {
    let app = app().await;

    let (status, _, body) = send(
        &app,
        form(Method::POST, "/users", "email=new%40b.com&password=secret"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "email": "new@b.com", "message": "user created" }));

    let (status, _, _) = send(
        &app,
        form(Method::POST, "/sessions", "email=new%40b.com&password=secret"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_duplicate_email_returns_400() {
    let app = app().await;

    let (status, _, body) = send(
        &app,
        form(Method::POST, "/users", "email=a%40b.com&password=pw"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "email already registered" }));
}

#[tokio::test]
async fn test_home_returns_greeting() {
    let app = app().await;
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Bienvenue" }));
}

// =========================================================================
// Store failures
// =========================================================================

/// A store whose backend is always down.
struct DownStore;

fn down() -> SessionError {
    SessionError::StoreUnavailable("backend offline".into())
}

impl SessionStore for DownStore {
    async fn put(&self, _session: Session) -> Result<(), SessionError> {
        Err(down())
    }

    async fn get(&self, _token: &SessionToken) -> Result<Option<Session>, SessionError> {
        Err(down())
    }

    async fn delete(&self, _token: &SessionToken) -> Result<bool, SessionError> {
        Err(down())
    }

    async fn delete_user(
        &self,
        _user_id: &UserId,
    ) -> Result<Vec<SessionToken>, SessionError> {
        Err(down())
    }

    async fn purge_expired(
        &self,
        _ttl: Option<Duration>,
    ) -> Result<usize, SessionError> {
        Err(down())
    }
}

#[tokio::test]
async fn test_store_outage_returns_503_not_403() {
    let accounts = AccountStore::with_cost(4);
    accounts.register("a@b.com", "pw").await.unwrap();
    let app = router(AppState::new(DownStore, accounts, SessionConfig::default()));
    let cookie = format!("_my_session_id={}", latchkey_session::generate_token());

    let (status, _, body) =
        send(&app, with_cookie(Method::GET, "/users/me", &cookie)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "error": "session store unavailable" }));

    let (status, headers, _) = send(
        &app,
        form(Method::POST, "/sessions", "email=a%40b.com&password=pw"),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(headers.get(SET_COOKIE).is_none());
}

// =========================================================================
// Bound server
// =========================================================================

#[tokio::test]
async fn test_builder_binds_ephemeral_port() {
    let server = LatchkeyServer::builder()
        .bind("127.0.0.1:0")
        .build(MemoryStore::new())
        .await
        .unwrap();

    let addr = server.local_addr().unwrap();

    assert_ne!(addr.port(), 0);
    assert_eq!(server.state().cookie_name(), "_my_session_id");
}

#[tokio::test]
async fn test_builder_rejects_zero_session_ttl() {
    let result = LatchkeyServer::builder()
        .bind("127.0.0.1:0")
        .session_config(SessionConfig {
            session_ttl: Some(Duration::ZERO),
            ..SessionConfig::default()
        })
        .build(MemoryStore::new())
        .await;

    assert!(matches!(
        result,
        Err(LatchkeyError::Session(SessionError::InvalidArgument(_)))
    ));
}
