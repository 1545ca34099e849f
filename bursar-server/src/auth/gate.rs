//! Request authorization gate
//!
//! Authentication always runs before any role check, so a request without a
//! valid token is a 401 even on a role-restricted route.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use super::token::{Identity, TokenService};
use crate::http::error::ApiError;
use crate::http::AppState;
use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Insufficient permission for this resource")]
    Forbidden,
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, GateError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(GateError::MissingToken)?;

    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(GateError::MissingToken),
    }
}

/// Resolve the caller's identity from request headers.
pub fn authenticate(headers: &HeaderMap, tokens: &TokenService) -> Result<Identity, GateError> {
    let token = bearer_token(headers)?;
    tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        GateError::InvalidToken
    })
}

impl Identity {
    pub fn require_role(self, allowed: &[Role]) -> Result<Self, GateError> {
        if allowed.contains(&self.role) {
            Ok(self)
        } else {
            Err(GateError::Forbidden)
        }
    }
}

/// Authenticate once per request; later extractors reuse the identity
/// stored in the request extensions.
fn identity_from_parts(parts: &mut Parts, state: &AppState) -> Result<Identity, GateError> {
    if let Some(identity) = parts.extensions.get::<Identity>() {
        return Ok(*identity);
    }
    let identity = authenticate(&parts.headers, &state.tokens)?;
    parts.extensions.insert(identity);
    Ok(identity)
}

/// Any authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Identity);

/// Authenticated caller with the learner role
#[derive(Debug, Clone, Copy)]
pub struct Learner(pub Identity);

/// Authenticated caller with the provider role
#[derive(Debug, Clone, Copy)]
pub struct Provider(pub Identity);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(identity_from_parts(parts, state)?))
    }
}

impl FromRequestParts<Arc<AppState>> for Learner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = identity_from_parts(parts, state)?;
        Ok(Self(identity.require_role(&[Role::Learner])?))
    }
}

impl FromRequestParts<Arc<AppState>> for Provider {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = identity_from_parts(parts, state)?;
        Ok(Self(identity.require_role(&[Role::Provider])?))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderValue;
    use uuid::Uuid;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_requires_scheme() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), Err(GateError::MissingToken));
        assert_eq!(bearer_token(&headers("Bearer ")), Err(GateError::MissingToken));
        assert_eq!(bearer_token(&HeaderMap::new()), Err(GateError::MissingToken));
    }

    #[test]
    fn authenticate_distinguishes_missing_from_invalid() {
        let tokens = TokenService::new(b"gate", Duration::from_secs(60));
        assert_eq!(
            authenticate(&HeaderMap::new(), &tokens),
            Err(GateError::MissingToken)
        );
        assert_eq!(
            authenticate(&headers("Bearer nope"), &tokens),
            Err(GateError::InvalidToken)
        );

        let id = Uuid::new_v4();
        let token = tokens.issue(id, Role::Learner).unwrap();
        let identity = authenticate(&headers(&format!("Bearer {token}")), &tokens).unwrap();
        assert_eq!(identity.subject, id);
    }

    #[test]
    fn require_role() {
        let identity = Identity {
            subject: Uuid::new_v4(),
            role: Role::Learner,
        };
        assert!(identity.require_role(&[Role::Learner]).is_ok());
        assert_eq!(
            identity.require_role(&[Role::Provider]),
            Err(GateError::Forbidden)
        );
    }
}
