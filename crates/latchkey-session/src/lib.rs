//! Session-based authentication for web APIs.
//!
//! This crate covers the session lifecycle and nothing else:
//!
//! 1. **Issuing**: generating an unguessable token for an authenticated
//!    user and recording it in a [`SessionStore`]
//! 2. **Resolving**: reading the token back out of a request cookie
//!    ([`CookieSource`]) and mapping it to a user
//! 3. **Revoking**: deleting the token on logout
//!
//! # How the pieces fit
//!
//! ```text
//! RequestAuthenticator      ← what route handlers talk to
//!     ↕
//! SessionAuthenticator      ← create / resolve / destroy
//!     ↕             ↕
//! SessionStore   UserDirectory (yours)
//!     ↕
//! generate_token()
//! ```
//!
//! Nothing here is process-global: the store is an ordinary value you
//! construct and hand to the authenticator.

mod authenticator;
mod config;
mod cookie;
mod error;
mod request;
mod store;
mod token;
mod types;

pub use authenticator::{SessionAuthenticator, UserDirectory};
pub use config::{DEFAULT_COOKIE_NAME, SessionConfig, SessionPolicy};
pub use cookie::{CookieSource, extract_token};
pub use error::SessionError;
pub use request::RequestAuthenticator;
pub use store::{MemoryStore, SessionStore, TimeoutStore};
pub use token::generate_token;
pub use types::{Session, SessionToken, UserId};
