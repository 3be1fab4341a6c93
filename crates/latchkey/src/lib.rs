//! # Latchkey
//!
//! Cookie-session login and logout for axum web APIs.
//!
//! The session machinery itself lives in [`latchkey_session`]; this crate
//! puts it behind HTTP. Logging in sets the session cookie and logging out
//! destroys the session. Credentials are checked against a small in-memory
//! account table.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use latchkey::prelude::*;
//!
//! # async fn start() -> Result<(), LatchkeyError> {
//! let settings = Settings::load()?;
//! init_telemetry(settings.json_logs());
//!
//! let server = LatchkeyServer::builder()
//!     .bind(&settings.bind_addr())
//!     .session_config(settings.session_config()?)
//!     .build(MemoryStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! ## Routes
//!
//! | method   | path                            |                         |
//! |----------|---------------------------------|-------------------------|
//! | `POST`   | `/sessions`                     | log in                  |
//! | `DELETE` | `/sessions`                     | log out                 |
//! | `POST`   | `/api/v1/auth_session/login`    | log in                  |
//! | `DELETE` | `/api/v1/auth_session/logout`   | log out                 |
//! | `POST`   | `/users`                        | register                |
//! | `GET`    | `/users/me`                     | the logged-in user      |
//! | `GET`    | `/`                             | liveness                |

mod accounts;
mod error;
mod handlers;
mod server;
mod settings;
mod telemetry;

pub use accounts::{AccountStore, User};
pub use error::{ApiError, LatchkeyError};
pub use handlers::{AppState, Credentials};
pub use server::{LatchkeyServer, LatchkeyServerBuilder, router};
pub use settings::Settings;
pub use telemetry::init_telemetry;

/// Re-exports for the common case.
pub mod prelude {
    pub use crate::{
        AccountStore, AppState, LatchkeyError, LatchkeyServer, Settings, User,
        init_telemetry, router,
    };
    pub use latchkey_session::{
        MemoryStore, RequestAuthenticator, SessionAuthenticator, SessionConfig,
        SessionPolicy, SessionStore, TimeoutStore,
    };
}
