//! Identity types: who a session belongs to, and the token that names it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SessionError;

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Opaque identifier of a user, as handed out by the user directory.
///
/// The only invariant is that it is not empty or blank. Construct it with
/// [`UserId::parse`] so that invariant holds everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Validates `raw` and wraps it.
    ///
    /// # Errors
    /// [`SessionError::InvalidArgument`] if `raw` is empty or whitespace.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        if raw.trim().is_empty() {
            return Err(SessionError::InvalidArgument(
                "user id must not be empty".into(),
            ));
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// SessionToken
// ---------------------------------------------------------------------------

/// The opaque value stored in the session cookie.
///
/// Always the 36-character hyphenated lowercase form of a random UUID,
/// e.g. `9b2d6c3e-8f41-4b7a-a0de-51f3c2e4d7a9`. Anything else a client
/// sends is rejected by [`SessionToken::parse`] before any store lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Length of the canonical hyphenated form.
    pub const LEN: usize = 36;

    pub(crate) fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.hyphenated().to_string())
    }

    /// Accepts only the canonical form produced by
    /// [`generate_token`](crate::generate_token).
    ///
    /// # Errors
    /// [`SessionError::InvalidArgument`] for anything else, including the
    /// braced, URN and uppercase spellings of an otherwise valid UUID.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let malformed =
            || SessionError::InvalidArgument("malformed session token".into());
        if raw.len() != Self::LEN {
            return Err(malformed());
        }
        let uuid = Uuid::try_parse(raw).map_err(|_| malformed())?;
        // Round-tripping rejects uppercase hex.
        if uuid.hyphenated().to_string() != raw {
            return Err(malformed());
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short prefix that is safe to put in logs.
    pub fn redacted(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One live session: the record a [`SessionStore`](crate::SessionStore)
/// keeps under its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Creates a record stamped with the current time.
    pub fn new(token: SessionToken, user_id: UserId) -> Self {
        Self {
            token,
            user_id,
            created_at: Utc::now(),
        }
    }

    /// Whether this session is older than `ttl` at instant `now`.
    ///
    /// A `created_at` in the future (clock skew) never counts as expired.
    pub fn is_expired_at(
        &self,
        now: DateTime<Utc>,
        ttl: std::time::Duration,
    ) -> bool {
        (now - self.created_at)
            .to_std()
            .map(|age| age >= ttl)
            .unwrap_or(false)
    }
}
