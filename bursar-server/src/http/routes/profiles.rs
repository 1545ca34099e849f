//! Profile endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidUuid};
use crate::http::server::AppState;
use crate::http::{data, Data};
use crate::models::{PublicProfile, User};
use crate::policy::{ProfileInput, ProfilePolicy};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub institution: Option<String>,
    pub field_of_study: Option<String>,
    pub avatar_url: Option<String>,
}

/// GET /api/profiles/me
async fn get_me(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Data<User>>, ApiError> {
    let user = ProfilePolicy::new(state.store.as_ref())
        .get_mine(identity)
        .await?;
    Ok(data(user))
}

/// PATCH /api/profiles/me
async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidJson(req): ValidJson<ProfileRequest>,
) -> Result<Json<Data<User>>, ApiError> {
    let input = ProfileInput {
        full_name: req.full_name,
        bio: req.bio,
        institution: req.institution,
        field_of_study: req.field_of_study,
        avatar_url: req.avatar_url,
    };
    let user = ProfilePolicy::new(state.store.as_ref())
        .update_mine(identity, input)
        .await?;
    Ok(data(user))
}

/// GET /api/profiles/{userId} - public view with social counters
async fn get_public(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    ValidUuid(user_id): ValidUuid,
) -> Result<Json<Data<PublicProfile>>, ApiError> {
    let profile = ProfilePolicy::new(state.store.as_ref())
        .get_public(user_id)
        .await?;
    Ok(data(profile))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profiles/me", get(get_me).patch(update_me))
        .route("/profiles/{userId}", get(get_public))
}
