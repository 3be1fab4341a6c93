//! `LatchkeyServer` builder and server loop.
//!
//! Ties the layers together: settings → session store → authenticator →
//! axum router.

use std::net::SocketAddr;

use axum::Router;
use axum::routing::{delete, get, post};
use latchkey_session::{MemoryStore, SessionConfig, SessionStore, TimeoutStore};
use tokio::net::TcpListener;

use crate::handlers::{self, AppState};
use crate::{AccountStore, LatchkeyError};

/// All routes, bound to `state`.
///
/// `/sessions` and `/api/v1/auth_session/*` are two spellings of the same
/// login and logout operations.
pub fn router<S: SessionStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/users", post(handlers::register_user::<S>))
        .route("/users/me", get(handlers::me::<S>))
        .route(
            "/sessions",
            post(handlers::login::<S>).delete(handlers::logout::<S>),
        )
        .route("/api/v1/auth_session/login", post(handlers::login::<S>))
        .route("/api/v1/auth_session/logout", delete(handlers::logout::<S>))
        .with_state(state)
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,ignore
/// use latchkey::prelude::*;
///
/// let server = LatchkeyServer::builder()
///     .bind("0.0.0.0:5000")
///     .build(MemoryStore::new())
///     .await?;
/// server.run().await
/// ```
pub struct LatchkeyServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    accounts: AccountStore,
}

impl LatchkeyServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            session_config: SessionConfig::default(),
            accounts: AccountStore::new(),
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Uses an existing account table, e.g. one seeded before startup.
    pub fn accounts(mut self, accounts: AccountStore) -> Self {
        self.accounts = accounts;
        self
    }

    /// Binds the listener and wires `store` behind a latency bound of
    /// `session_config.store_timeout`.
    ///
    /// # Errors
    /// An invalid session config (see [`SessionConfig::validate`]) or a
    /// failed bind.
    pub async fn build<S: SessionStore>(
        self,
        store: S,
    ) -> Result<LatchkeyServer<TimeoutStore<S>>, LatchkeyError> {
        self.session_config.validate()?;
        let listener = TcpListener::bind(&self.bind_addr).await?;
        let store = TimeoutStore::new(store, self.session_config.store_timeout);

        tracing::info!(
            addr = %listener.local_addr()?,
            cookie = %self.session_config.cookie_name,
            policy = %self.session_config.policy,
            "server bound"
        );

        Ok(LatchkeyServer {
            listener,
            state: AppState::new(store, self.accounts, self.session_config),
        })
    }
}

impl Default for LatchkeyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server. Call [`run()`](Self::run) to start serving.
pub struct LatchkeyServer<S> {
    listener: TcpListener,
    state: AppState<S>,
}

impl LatchkeyServer<TimeoutStore<MemoryStore>> {
    pub fn builder() -> LatchkeyServerBuilder {
        LatchkeyServerBuilder::new()
    }
}

impl<S: SessionStore> LatchkeyServer<S> {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &AppState<S> {
        &self.state
    }

    /// Serves requests until the process is terminated.
    ///
    /// With a session TTL configured, a background task also sweeps
    /// expired sessions once per TTL period.
    pub async fn run(self) -> Result<(), LatchkeyError> {
        if let Some(ttl) = self.state.auth.sessions().config().session_ttl {
            let state = self.state.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(ttl);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    match state.auth.sessions().purge_expired().await {
                        Ok(0) => {}
                        Ok(purged) => tracing::info!(purged, "expired sessions purged"),
                        Err(error) => tracing::warn!(%error, "session purge failed"),
                    }
                }
            });
        }

        tracing::info!("latchkey server running");
        axum::serve(self.listener, router(self.state)).await?;
        Ok(())
    }
}
