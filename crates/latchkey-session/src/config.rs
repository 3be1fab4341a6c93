//! Session behaviour knobs.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Cookie name used when nothing else is configured.
pub const DEFAULT_COOKIE_NAME: &str = "_my_session_id";

// ---------------------------------------------------------------------------
// SessionPolicy
// ---------------------------------------------------------------------------

/// How many live sessions a single user may hold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SessionPolicy {
    /// Every login gets its own token; earlier sessions stay valid until
    /// they are destroyed. Concurrent logins never contend.
    #[default]
    Multi,

    /// A login revokes every other session of the same user. Concurrent
    /// logins resolve last-writer-wins: exactly one token survives.
    Single,
}

impl FromStr for SessionPolicy {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multi" => Ok(Self::Multi),
            "single" => Ok(Self::Single),
            other => Err(SessionError::InvalidArgument(format!(
                "unknown session policy `{other}` (expected `multi` or `single`)"
            ))),
        }
    }
}

impl fmt::Display for SessionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multi => f.write_str("multi"),
            Self::Single => f.write_str("single"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`SessionAuthenticator`](crate::SessionAuthenticator).
///
/// Start from `SessionConfig::default()` and override the fields you care
/// about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session token.
    ///
    /// Default: [`DEFAULT_COOKIE_NAME`].
    pub cookie_name: String,

    /// Default: [`SessionPolicy::Multi`].
    pub policy: SessionPolicy,

    /// Sessions older than this read as absent. `None` keeps sessions
    /// until they are destroyed.
    ///
    /// Default: `None`.
    pub session_ttl: Option<Duration>,

    /// Upper bound on a single store call when the store is wrapped in a
    /// [`TimeoutStore`](crate::TimeoutStore).
    ///
    /// Default: 2 seconds.
    pub store_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_owned(),
            policy: SessionPolicy::default(),
            session_ttl: None,
            store_timeout: Duration::from_secs(2),
        }
    }
}

impl SessionConfig {
    /// Rejects settings no server can run with.
    ///
    /// # Errors
    /// [`SessionError::InvalidArgument`] for a zero `session_ttl` (every
    /// session would be expired on creation) or a blank `cookie_name`.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.session_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(SessionError::InvalidArgument(
                "session ttl must be greater than zero".into(),
            ));
        }
        if self.cookie_name.trim().is_empty() {
            return Err(SessionError::InvalidArgument(
                "session cookie name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_documented_values() {
        let config = SessionConfig::default();
        assert_eq!(config.cookie_name, "_my_session_id");
        assert_eq!(config.policy, SessionPolicy::Multi);
        assert_eq!(config.session_ttl, None);
        assert_eq!(config.store_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_policy_from_str_is_case_insensitive() {
        assert_eq!("single".parse::<SessionPolicy>(), Ok(SessionPolicy::Single));
        assert_eq!(" Multi ".parse::<SessionPolicy>(), Ok(SessionPolicy::Multi));
    }

    #[test]
    fn test_policy_from_str_unknown_returns_invalid_argument() {
        assert!(matches!(
            "many".parse::<SessionPolicy>(),
            Err(SessionError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_default_is_ok() {
        assert_eq!(SessionConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_validate_zero_ttl_returns_invalid_argument() {
        let config = SessionConfig {
            session_ttl: Some(Duration::ZERO),
            ..SessionConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidArgument(_))
        ));
    }
}
