//! The session authenticator: create, resolve and destroy sessions.
//!
//! # Lifecycle
//!
//! ```text
//!            create_session()
//!   absent ───────────────────→ active ──┐ resolve_user()
//!     ↑                           │  ↑───┘
//!     └───────────────────────────┘
//!      destroy_session() / expiry / put_exclusive() by a newer login
//! ```
//!
//! Absence is never an error: unknown tokens, missing cookies and
//! malformed input all come back as `None` (or `false` for destroy).
//! Errors are reserved for the store itself failing.

use std::future::Future;

use chrono::Utc;

use crate::{
    CookieSource, Session, SessionConfig, SessionError, SessionPolicy,
    SessionStore, SessionToken, UserId, extract_token, generate_token,
};

/// Where users live. Implemented by the application.
///
/// The authenticator only ever asks one question: "which user has this
/// id?". Returning `Ok(None)` for an unknown id is expected; errors should
/// be reserved for the directory itself failing.
pub trait UserDirectory: Send + Sync + 'static {
    /// The application's user record.
    type User: Clone + Send + Sync + 'static;

    fn get(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Option<Self::User>, SessionError>> + Send;
}

/// Issues, resolves and revokes sessions.
///
/// Owns its [`SessionStore`] and [`UserDirectory`]; both are passed in at
/// construction, so two authenticators never share state by accident.
#[derive(Debug)]
pub struct SessionAuthenticator<S, D> {
    store: S,
    directory: D,
    config: SessionConfig,
}

impl<S, D> SessionAuthenticator<S, D>
where
    S: SessionStore,
    D: UserDirectory,
{
    pub fn new(store: S, directory: D, config: SessionConfig) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Name of the cookie this authenticator reads tokens from.
    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Starts a session for `user_id` and returns its token.
    ///
    /// A missing, empty or blank user id creates nothing and returns
    /// `Ok(None)`. Under [`SessionPolicy::Single`] every other session of
    /// the user is revoked in the same store operation.
    ///
    /// # Errors
    /// [`SessionError::StoreUnavailable`] if the store cannot be written.
    pub async fn create_session(
        &self,
        user_id: Option<&str>,
    ) -> Result<Option<SessionToken>, SessionError> {
        let Some(Ok(user_id)) = user_id.map(UserId::parse) else {
            tracing::debug!("no session created: missing or empty user id");
            return Ok(None);
        };

        let token = generate_token();
        let session = Session::new(token.clone(), user_id.clone());

        match self.config.policy {
            SessionPolicy::Multi => self.store.put(session).await?,
            SessionPolicy::Single => {
                let revoked = self.store.put_exclusive(session).await?;
                if !revoked.is_empty() {
                    tracing::info!(
                        %user_id,
                        revoked = revoked.len(),
                        "previous sessions revoked by new login"
                    );
                }
            }
        }

        tracing::info!(%user_id, token = token.redacted(), "session created");
        Ok(Some(token))
    }

    /// Maps a token to the user that owns it.
    ///
    /// `None` and malformed tokens are rejected without touching the
    /// store. Unknown and expired tokens resolve to `Ok(None)`.
    pub async fn resolve_user(
        &self,
        token: Option<&str>,
    ) -> Result<Option<UserId>, SessionError> {
        let Some(Ok(token)) = token.map(SessionToken::parse) else {
            return Ok(None);
        };
        Ok(self.live_session(&token).await?.map(|s| s.user_id))
    }

    /// The user behind the request's session cookie, or `None`.
    ///
    /// Never fails: store and directory errors are logged and treated as
    /// "no user". Use [`lookup_current_user`](Self::lookup_current_user)
    /// when the difference matters.
    pub async fn current_user<R>(&self, request: Option<&R>) -> Option<D::User>
    where
        R: CookieSource + ?Sized,
    {
        match self.lookup_current_user(request).await {
            Ok(user) => user,
            Err(error) => {
                tracing::warn!(%error, "could not resolve current user");
                None
            }
        }
    }

    /// Like [`current_user`](Self::current_user) but keeps errors.
    pub async fn lookup_current_user<R>(
        &self,
        request: Option<&R>,
    ) -> Result<Option<D::User>, SessionError>
    where
        R: CookieSource + ?Sized,
    {
        let token = extract_token(request, &self.config.cookie_name);
        let Some(user_id) = self.resolve_user(token.as_deref()).await? else {
            return Ok(None);
        };
        let user = self.directory.get(&user_id).await?;
        if user.is_none() {
            tracing::debug!(%user_id, "session refers to an unknown user");
        }
        Ok(user)
    }

    /// Logs the request's session out.
    ///
    /// Returns `Ok(false)`, changing nothing, when the request has no
    /// session cookie or the token is not a live session. Calling it twice
    /// with the same cookie therefore yields `true` and then `false`.
    pub async fn destroy_session<R>(
        &self,
        request: Option<&R>,
    ) -> Result<bool, SessionError>
    where
        R: CookieSource + ?Sized,
    {
        let raw = extract_token(request, &self.config.cookie_name);
        let Some(Ok(token)) = raw.as_deref().map(SessionToken::parse) else {
            return Ok(false);
        };
        let Some(session) = self.live_session(&token).await? else {
            return Ok(false);
        };

        let removed = self.store.delete(&token).await?;
        if removed {
            tracing::info!(
                user_id = %session.user_id,
                token = token.redacted(),
                "session destroyed"
            );
        }
        Ok(removed)
    }

    /// Revokes every session of `user_id`. Returns how many there were.
    pub async fn destroy_all_sessions(
        &self,
        user_id: &UserId,
    ) -> Result<usize, SessionError> {
        let revoked = self.store.delete_user(user_id).await?;
        tracing::info!(%user_id, revoked = revoked.len(), "all sessions destroyed");
        Ok(revoked.len())
    }

    /// Drops expired sessions from the store, measured against the
    /// configured `session_ttl` (and any TTL the store applies itself).
    pub async fn purge_expired(&self) -> Result<usize, SessionError> {
        self.store.purge_expired(self.config.session_ttl).await
    }

    /// Fetches a session and applies the configured TTL, so expiry holds
    /// even for stores that don't track it themselves.
    async fn live_session(
        &self,
        token: &SessionToken,
    ) -> Result<Option<Session>, SessionError> {
        let Some(session) = self.store.get(token).await? else {
            return Ok(None);
        };
        match self.config.session_ttl {
            Some(ttl) if session.is_expired_at(Utc::now(), ttl) => {
                tracing::debug!(
                    token = token.redacted(),
                    "session expired, removing"
                );
                self.store.delete(token).await?;
                Ok(None)
            }
            _ => Ok(Some(session)),
        }
    }
}
