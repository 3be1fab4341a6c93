//! In-memory user accounts with bcrypt-hashed passwords.
//!
//! This is the user directory the bundled server authenticates against.
//! Applications with their own user table implement
//! [`UserDirectory`] for it instead and keep only the session pieces.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use latchkey_session::{SessionError, UserDirectory, UserId};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::ApiError;

/// A registered user, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    password_hash: String,
}

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<String, User>,
    /// email → id
    by_email: HashMap<String, String>,
}

/// Shared, cloneable account table.
#[derive(Debug, Clone)]
pub struct AccountStore {
    inner: Arc<RwLock<Accounts>>,
    cost: u32,
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore {
    pub fn new() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }

    /// Uses a specific bcrypt cost. Low costs are only for tests.
    pub fn with_cost(cost: u32) -> Self {
        Self {
            inner: Arc::default(),
            cost,
        }
    }

    /// Creates an account for `email`.
    ///
    /// # Errors
    /// - [`ApiError::EmailTaken`] if the email is already registered
    /// - [`ApiError::Password`] if hashing fails
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        if self.find_by_email(email).await.is_some() {
            return Err(ApiError::EmailTaken);
        }
        let password_hash = self.hash(password).await?;

        let mut accounts = self.inner.write().await;
        // Someone may have registered the same email while we hashed.
        if accounts.by_email.contains_key(email) {
            return Err(ApiError::EmailTaken);
        }
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_owned(),
            first_name: None,
            last_name: None,
            created_at: Utc::now(),
            password_hash,
        };
        accounts
            .by_email
            .insert(user.email.clone(), user.id.clone());
        accounts.by_id.insert(user.id.clone(), user.clone());

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Option<User> {
        let accounts = self.inner.read().await;
        let id = accounts.by_email.get(email)?;
        accounts.by_id.get(id).cloned()
    }

    pub async fn find_by_id(&self, id: &str) -> Option<User> {
        self.inner.read().await.by_id.get(id).cloned()
    }

    /// Checks `password` against the stored hash, off the async threads.
    pub async fn verify_password(
        &self,
        user: &User,
        password: &str,
    ) -> Result<bool, ApiError> {
        let password = password.to_owned();
        let hash = user.password_hash.clone();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(ApiError::from)
    }

    async fn hash(&self, password: &str) -> Result<String, ApiError> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(ApiError::from)
    }
}

impl UserDirectory for AccountStore {
    type User = User;

    async fn get(&self, user_id: &UserId) -> Result<Option<User>, SessionError> {
        Ok(self.find_by_id(user_id.as_str()).await)
    }
}
