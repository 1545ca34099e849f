//! Registration and login

use serde::Serialize;

use super::{PolicyError, PolicyResult};
use crate::auth::{hash_password, verify_password, TokenService};
use crate::models::validation::required;
use crate::models::{user, Email, NewUser, Role, User};
use crate::store::Store;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Sanitized user plus a freshly issued token
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub struct AccountPolicy<'a> {
    store: &'a dyn Store,
    tokens: &'a TokenService,
}

impl<'a> AccountPolicy<'a> {
    pub fn new(store: &'a dyn Store, tokens: &'a TokenService) -> Self {
        Self { store, tokens }
    }

    pub async fn register(
        &self,
        full_name: Option<String>,
        email: Option<String>,
        password: Option<String>,
        role: Option<String>,
    ) -> PolicyResult<Session> {
        let full_name = user::full_name(full_name)?;
        let email = Email::new(&required(email, "email")?)?;
        let password = user::password(password)?;
        let role: Role = required(role, "role")?.parse()?;

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| PolicyError::Internal(format!("hashing task failed: {e}")))??;

        let user = self
            .store
            .create_user(NewUser {
                full_name,
                email,
                password_hash,
                role,
            })
            .await?;
        tracing::info!(user_id = %user.id, role = %user.role, "account registered");

        let token = self.tokens.issue(user.id, user.role)?;
        Ok(Session { user, token })
    }

    pub async fn login(&self, email: Option<String>, password: Option<String>) -> PolicyResult<Session> {
        let email = required(email, "email")?;
        let password = required(password, "password")?;

        // A malformed address cannot belong to an account.
        let Ok(email) = Email::new(&email) else {
            return Err(PolicyError::Unauthorized(INVALID_CREDENTIALS));
        };
        let Some(credentials) = self.store.find_credentials(&email).await? else {
            tracing::debug!("login for unknown email");
            return Err(PolicyError::Unauthorized(INVALID_CREDENTIALS));
        };

        let stored = credentials.password_hash;
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| PolicyError::Internal(format!("verification task failed: {e}")))??;
        if !matches {
            tracing::debug!(user_id = %credentials.user.id, "login with wrong password");
            return Err(PolicyError::Unauthorized(INVALID_CREDENTIALS));
        }

        let user = credentials.user;
        let token = self.tokens.issue(user.id, user.role)?;
        Ok(Session { user, token })
    }
}
