//! Session storage: the token → user mapping.
//!
//! [`SessionStore`] is the seam between the authenticator and wherever
//! sessions actually live. Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: process-local, lock-protected maps
//! - [`TimeoutStore`]: wraps another store and bounds every call, turning
//!   a hung backend into [`SessionError::StoreUnavailable`]
//!
//! A database- or cache-backed store implements the same trait and reports
//! its own faults as `StoreUnavailable`, never as "not found".

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{Session, SessionError, SessionToken, UserId};

/// The only owner of the token → user mapping.
///
/// All methods take `&self`: implementations provide their own interior
/// synchronisation so one store can serve every request concurrently.
pub trait SessionStore: Send + Sync + 'static {
    /// Inserts `session` under its token, overwriting any previous record
    /// with the same token.
    fn put(
        &self,
        session: Session,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Inserts `session` and removes every other session of the same user.
    ///
    /// Returns the tokens that were revoked. Implementations should make
    /// the whole operation atomic; the default body is only as atomic as
    /// the two calls it is made of.
    fn put_exclusive(
        &self,
        session: Session,
    ) -> impl Future<Output = Result<Vec<SessionToken>, SessionError>> + Send
    {
        async move {
            let revoked = self.delete_user(&session.user_id).await?;
            self.put(session).await?;
            Ok(revoked)
        }
    }

    /// Looks up a token. Unknown and expired tokens are `Ok(None)`.
    fn get(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<Option<Session>, SessionError>> + Send;

    /// Removes a token. Returns whether a live session was removed;
    /// removing a missing token is not an error.
    fn delete(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<bool, SessionError>> + Send;

    /// Removes every session of `user_id` and returns their tokens.
    fn delete_user(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<SessionToken>, SessionError>> + Send;

    /// Drops sessions older than `ttl`, or than the store's own TTL when
    /// that is shorter. Returns how many were dropped. With neither set,
    /// nothing expires and the result is 0.
    fn purge_expired(
        &self,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<usize, SessionError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// An in-process [`SessionStore`].
///
/// Sessions live in a `HashMap` keyed by token, with a second map from
/// user to that user's tokens so per-user operations don't scan. Both maps
/// sit behind one `RwLock` and are only ever changed together.
///
/// Cloning is cheap and every clone shares the same sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Maps>>,
    ttl: Option<Duration>,
}

#[derive(Debug, Default)]
struct Maps {
    sessions: HashMap<SessionToken, Session>,
    by_user: HashMap<UserId, HashSet<SessionToken>>,
}

impl Maps {
    fn insert(&mut self, session: Session) {
        // Overwriting a token that belonged to someone else must not leave
        // it listed under the old owner.
        if let Some(previous) = self.sessions.get(&session.token).cloned() {
            self.unindex(&previous);
        }
        self.by_user
            .entry(session.user_id.clone())
            .or_default()
            .insert(session.token.clone());
        self.sessions.insert(session.token.clone(), session);
    }

    fn remove(&mut self, token: &SessionToken) -> Option<Session> {
        let session = self.sessions.remove(token)?;
        self.unindex(&session);
        Some(session)
    }

    fn remove_user(&mut self, user_id: &UserId) -> Vec<SessionToken> {
        let tokens: Vec<_> = self
            .by_user
            .remove(user_id)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        for token in &tokens {
            self.sessions.remove(token);
        }
        tokens
    }

    fn unindex(&mut self, session: &Session) {
        if let Some(tokens) = self.by_user.get_mut(&session.user_id) {
            tokens.remove(&session.token);
            if tokens.is_empty() {
                self.by_user.remove(&session.user_id);
            }
        }
    }
}

impl MemoryStore {
    /// Creates an empty store whose sessions never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions older than `ttl` read as absent and are dropped lazily.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Number of stored sessions, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.sessions.is_empty()
    }

    /// Tokens currently held by `user_id`.
    pub async fn tokens_for(&self, user_id: &UserId) -> Vec<SessionToken> {
        self.inner
            .read()
            .await
            .by_user
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn is_expired(&self, session: &Session) -> bool {
        self.ttl
            .is_some_and(|ttl| session.is_expired_at(Utc::now(), ttl))
    }
}

impl SessionStore for MemoryStore {
    async fn put(&self, session: Session) -> Result<(), SessionError> {
        self.inner.write().await.insert(session);
        Ok(())
    }

    async fn put_exclusive(
        &self,
        session: Session,
    ) -> Result<Vec<SessionToken>, SessionError> {
        let mut maps = self.inner.write().await;
        let revoked = maps.remove_user(&session.user_id);
        maps.insert(session);
        Ok(revoked)
    }

    async fn get(
        &self,
        token: &SessionToken,
    ) -> Result<Option<Session>, SessionError> {
        let found = self.inner.read().await.sessions.get(token).cloned();
        match found {
            Some(session) if self.is_expired(&session) => {
                let mut maps = self.inner.write().await;
                // Re-check under the write lock: the token may have been
                // replaced by a fresh session in between.
                if maps
                    .sessions
                    .get(token)
                    .is_some_and(|current| self.is_expired(current))
                {
                    maps.remove(token);
                    tracing::debug!(
                        token = session.token.redacted(),
                        "dropped expired session"
                    );
                }
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn delete(&self, token: &SessionToken) -> Result<bool, SessionError> {
        let removed = self.inner.write().await.remove(token);
        Ok(removed.is_some_and(|session| !self.is_expired(&session)))
    }

    async fn delete_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SessionToken>, SessionError> {
        Ok(self.inner.write().await.remove_user(user_id))
    }

    async fn purge_expired(
        &self,
        ttl: Option<Duration>,
    ) -> Result<usize, SessionError> {
        let ttl = match (ttl, self.ttl) {
            (Some(a), Some(b)) => a.min(b),
            (Some(ttl), None) | (None, Some(ttl)) => ttl,
            (None, None) => return Ok(0),
        };
        let now = Utc::now();
        let mut maps = self.inner.write().await;
        let expired: Vec<SessionToken> = maps
            .sessions
            .values()
            .filter(|session| session.is_expired_at(now, ttl))
            .map(|session| session.token.clone())
            .collect();
        for token in &expired {
            maps.remove(token);
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "purged expired sessions");
        }
        Ok(expired.len())
    }
}

// ---------------------------------------------------------------------------
// TimeoutStore
// ---------------------------------------------------------------------------

/// Bounds every call to an inner store.
///
/// A call that does not finish within the limit is abandoned and reported
/// as [`SessionError::StoreUnavailable`], so a stuck backend degrades into
/// failed requests instead of piling up hung ones.
#[derive(Debug, Clone)]
pub struct TimeoutStore<S> {
    inner: S,
    limit: Duration,
}

impl<S: SessionStore> TimeoutStore<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, SessionError>>,
    ) -> Result<T, SessionError> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, limit = ?self.limit, "session store timed out");
                Err(SessionError::StoreUnavailable(format!(
                    "{op} timed out after {:?}",
                    self.limit
                )))
            }
        }
    }
}

impl<S: SessionStore> SessionStore for TimeoutStore<S> {
    async fn put(&self, session: Session) -> Result<(), SessionError> {
        self.bounded("put", self.inner.put(session)).await
    }

    async fn put_exclusive(
        &self,
        session: Session,
    ) -> Result<Vec<SessionToken>, SessionError> {
        self.bounded("put_exclusive", self.inner.put_exclusive(session))
            .await
    }

    async fn get(
        &self,
        token: &SessionToken,
    ) -> Result<Option<Session>, SessionError> {
        self.bounded("get", self.inner.get(token)).await
    }

    async fn delete(&self, token: &SessionToken) -> Result<bool, SessionError> {
        self.bounded("delete", self.inner.delete(token)).await
    }

    async fn delete_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SessionToken>, SessionError> {
        self.bounded("delete_user", self.inner.delete_user(user_id))
            .await
    }

    async fn purge_expired(
        &self,
        ttl: Option<Duration>,
    ) -> Result<usize, SessionError> {
        self.bounded("purge_expired", self.inner.purge_expired(ttl)).await
    }
}
