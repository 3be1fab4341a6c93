//! Request handlers: login, logout, registration and the current user.
//!
//! Handlers only translate between HTTP and the session layer. Who the
//! caller is gets decided by [`RequestAuthenticator`]; what each failure
//! looks like on the wire is decided by [`ApiError`].

use axum::extract::State;
use axum::{Form, Json};
use axum::extract::rejection::FormRejection;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use biscotti::{
    Processor, ProcessorConfig, RemovalCookie, ResponseCookie, ResponseCookies,
    SameSite,
};
use latchkey_session::{
    RequestAuthenticator, SessionAuthenticator, SessionConfig, SessionStore,
};
use serde::Deserialize;
use serde_json::json;

use crate::{AccountStore, ApiError, User};

/// Shared state handed to every handler.
pub struct AppState<S> {
    pub auth: RequestAuthenticator<S, AccountStore>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
        }
    }
}

impl<S: SessionStore> AppState<S> {
    pub fn new(store: S, accounts: AccountStore, config: SessionConfig) -> Self {
        Self {
            auth: RequestAuthenticator::new(SessionAuthenticator::new(
                store, accounts, config,
            )),
        }
    }

    pub fn accounts(&self) -> &AccountStore {
        self.auth.sessions().directory()
    }

    pub fn cookie_name(&self) -> &str {
        self.auth.sessions().cookie_name()
    }
}

/// `email` / `password` form fields. Both optional so that a missing
/// field becomes a 400 with a precise message rather than a rejection.
#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    fn from_form(form: Result<Form<Credentials>, FormRejection>) -> Self {
        match form {
            Ok(Form(credentials)) => credentials,
            Err(rejection) => {
                tracing::debug!(%rejection, "unreadable credentials form");
                Self::default()
            }
        }
    }

    /// Both fields, non-empty, or the matching "missing" error.
    fn require(self) -> Result<(String, String), ApiError> {
        let email = self
            .email
            .filter(|e| !e.is_empty())
            .ok_or(ApiError::EmailMissing)?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or(ApiError::PasswordMissing)?;
        Ok((email, password))
    }
}

/// GET /
pub async fn home() -> Json<serde_json::Value> {
    Json(json!({ "message": "Bienvenue" }))
}

/// POST /users
pub async fn register_user<S: SessionStore>(
    State(state): State<AppState<S>>,
    form: Result<Form<Credentials>, FormRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (email, password) = Credentials::from_form(form).require()?;
    let user = state.accounts().register(&email, &password).await?;
    Ok(Json(json!({ "email": user.email, "message": "user created" })))
}

/// POST /sessions, POST /api/v1/auth_session/login
///
/// On success the body is the user and the response sets the session
/// cookie.
pub async fn login<S: SessionStore>(
    State(state): State<AppState<S>>,
    form: Result<Form<Credentials>, FormRejection>,
) -> Result<Response, ApiError> {
    let (email, password) = Credentials::from_form(form).require()?;

    let accounts = state.accounts();
    let user = accounts
        .find_by_email(&email)
        .await
        .ok_or(ApiError::UnknownEmail)?;
    if !accounts.verify_password(&user, &password).await? {
        return Err(ApiError::WrongPassword);
    }

    let token = state
        .auth
        .sessions()
        .create_session(Some(user.id.as_str()))
        .await?
        .ok_or_else(|| ApiError::Internal("no session created".into()))?;

    let mut cookies = ResponseCookies::new();
    cookies.insert(
        ResponseCookie::new(state.cookie_name().to_owned(), token.to_string())
            .set_path("/")
            .set_http_only(true)
            .set_same_site(SameSite::Lax),
    );
    let mut response = Json(user).into_response();
    append_cookies(&mut response, cookies)?;
    Ok(response)
}

/// DELETE /sessions, DELETE /api/v1/auth_session/logout
pub async fn logout<S: SessionStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if !state.auth.sessions().destroy_session(Some(&headers)).await? {
        return Err(ApiError::SessionNotFound);
    }

    let mut cookies = ResponseCookies::new();
    cookies.insert(RemovalCookie::new(state.cookie_name().to_owned()).set_path("/"));
    let mut response = (StatusCode::OK, Json(json!({}))).into_response();
    append_cookies(&mut response, cookies)?;
    Ok(response)
}

/// GET /users/me
pub async fn me<S: SessionStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError> {
    let user = state.auth.require_authenticated(Some(&headers)).await?;
    Ok(Json(user))
}

fn append_cookies(
    response: &mut Response,
    cookies: ResponseCookies<'static>,
) -> Result<(), ApiError> {
    let processor: Processor = ProcessorConfig::default().into();
    for value in cookies.header_values(&processor) {
        let value = HeaderValue::from_str(&value)
            .map_err(|e| ApiError::Internal(format!("bad Set-Cookie value: {e}")))?;
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(())
}
