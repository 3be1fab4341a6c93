//! Runtime settings, read from the environment.
//!
//! Every setting has a default, so an empty environment starts a working
//! server. A `.env` file in the working directory is honoured if present.
//!
//! | variable                   | default          |
//! |----------------------------|------------------|
//! | `API_HOST`                 | `0.0.0.0`        |
//! | `API_PORT`                 | `5000`           |
//! | `SESSION_NAME`             | `_my_session_id` |
//! | `SESSION_POLICY`           | `multi`          |
//! | `SESSION_TTL_SECS`         | unset (no TTL)   |
//! | `SESSION_STORE_TIMEOUT_MS` | `2000`           |
//! | `LOG_FORMAT`               | `pretty`         |

use std::time::Duration;

use config::{Config, Environment};
use latchkey_session::{DEFAULT_COOKIE_NAME, SessionConfig, SessionPolicy};
use serde::Deserialize;

use crate::LatchkeyError;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_host: String,
    pub api_port: u16,
    pub session_name: String,
    pub session_policy: String,
    #[serde(default)]
    pub session_ttl_secs: Option<u64>,
    pub session_store_timeout_ms: u64,
    pub log_format: String,
}

impl Settings {
    /// Loads `.env` (if any) and then the process environment.
    pub fn load() -> Result<Self, LatchkeyError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_environment(Environment::default())
    }

    /// Builds settings from an explicit environment source. Tests feed a
    /// fixed map through here instead of touching process state.
    pub fn from_environment(env: Environment) -> Result<Self, LatchkeyError> {
        let settings = Config::builder()
            .set_default("api_host", "0.0.0.0")?
            .set_default("api_port", 5000)?
            .set_default("session_name", DEFAULT_COOKIE_NAME)?
            .set_default("session_policy", "multi")?
            .set_default("session_store_timeout_ms", 2000)?
            .set_default("log_format", "pretty")?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// The session settings in the form the authenticator takes.
    ///
    /// # Errors
    /// An unknown `SESSION_POLICY`, or `SESSION_TTL_SECS=0`.
    pub fn session_config(&self) -> Result<SessionConfig, LatchkeyError> {
        let policy: SessionPolicy = self.session_policy.parse()?;
        let cookie_name = match self.session_name.trim() {
            "" => {
                tracing::warn!(
                    default = DEFAULT_COOKIE_NAME,
                    "SESSION_NAME is empty, using the default cookie name"
                );
                DEFAULT_COOKIE_NAME.to_owned()
            }
            name => name.to_owned(),
        };
        let config = SessionConfig {
            cookie_name,
            policy,
            session_ttl: self.session_ttl_secs.map(Duration::from_secs),
            store_timeout: Duration::from_millis(self.session_store_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
