//! The entry point route handlers use to ask "who is calling?".

use std::sync::Arc;

use crate::{CookieSource, SessionAuthenticator, SessionError, SessionStore, UserDirectory};

/// Shared front door to a [`SessionAuthenticator`].
///
/// Clones share one authenticator, so this is what goes into handler
/// state. Protected routes call
/// [`require_authenticated`](Self::require_authenticated) and never
/// repeat the "is there a user?" check themselves.
pub struct RequestAuthenticator<S, D> {
    sessions: Arc<SessionAuthenticator<S, D>>,
}

impl<S, D> Clone for RequestAuthenticator<S, D> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<S, D> RequestAuthenticator<S, D>
where
    S: SessionStore,
    D: UserDirectory,
{
    pub fn new(sessions: SessionAuthenticator<S, D>) -> Self {
        Self {
            sessions: Arc::new(sessions),
        }
    }

    /// The wrapped authenticator, for login and logout.
    pub fn sessions(&self) -> &SessionAuthenticator<S, D> {
        &self.sessions
    }

    /// The user behind the request, or `None`.
    pub async fn current_user<R>(&self, request: Option<&R>) -> Option<D::User>
    where
        R: CookieSource + ?Sized,
    {
        self.sessions.current_user(request).await
    }

    /// The user behind the request.
    ///
    /// # Errors
    /// - [`SessionError::Unauthenticated`]: no cookie, unknown or expired
    ///   token, or the user no longer exists
    /// - [`SessionError::StoreUnavailable`]: the lookup itself failed, so
    ///   the caller can answer "try again" rather than "log in"
    pub async fn require_authenticated<R>(
        &self,
        request: Option<&R>,
    ) -> Result<D::User, SessionError>
    where
        R: CookieSource + ?Sized,
    {
        match self.sessions.lookup_current_user(request).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(SessionError::Unauthenticated),
            Err(error @ SessionError::StoreUnavailable(_)) => Err(error),
            Err(error) => {
                tracing::warn!(%error, "treating failed lookup as unauthenticated");
                Err(SessionError::Unauthenticated)
            }
        }
    }
}
