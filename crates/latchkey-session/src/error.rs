//! Error types for the session layer.

/// Errors that can occur while issuing, resolving or revoking sessions.
///
/// "Not found" is normally *not* an error here: lookups return `None` for
/// unknown tokens and users. The variants below are reserved for inputs
/// that cannot be processed, backing-store faults, and the policy-level
/// refusal raised by
/// [`RequestAuthenticator::require_authenticated`](crate::RequestAuthenticator::require_authenticated).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A user id or token was empty or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A record that the caller insisted on was missing.
    ///
    /// Internal lookups report absence as `None`; this variant exists for
    /// collaborators (such as a user directory) that need to signal a
    /// dangling reference explicitly.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backing store failed or did not answer in time.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),

    /// The request carries no valid session.
    #[error("request is not authenticated")]
    Unauthenticated,
}
