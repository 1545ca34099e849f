//! Bursary endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;

use crate::auth::Provider;
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidUuid};
use crate::http::server::AppState;
use crate::http::{data, Data};
use crate::models::{Bursary, BursaryListing};
use crate::policy::{BursaryInput, BursaryPolicy};

/// Create or partially update a bursary; absent fields are `None`
#[derive(Debug, Default, Deserialize)]
pub struct BursaryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub deadline: Option<String>,
    pub status: Option<String>,
}

impl From<BursaryRequest> for BursaryInput {
    fn from(r: BursaryRequest) -> Self {
        Self {
            title: r.title,
            description: r.description,
            amount: r.amount,
            deadline: r.deadline,
            status: r.status,
        }
    }
}

/// GET /api/bursaries - open bursaries, earliest deadline first
async fn list_bursaries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Data<Vec<BursaryListing>>>, ApiError> {
    let listings = BursaryPolicy::new(state.store.as_ref()).list().await?;
    Ok(data(listings))
}

/// POST /api/bursaries
async fn create_bursary(
    State(state): State<Arc<AppState>>,
    Provider(provider): Provider,
    ValidJson(req): ValidJson<BursaryRequest>,
) -> Result<(StatusCode, Json<Data<Bursary>>), ApiError> {
    let mut input = BursaryInput::from(req);
    // New bursaries always start open.
    input.status = None;
    let bursary = BursaryPolicy::new(state.store.as_ref())
        .create(provider, input)
        .await?;
    Ok((StatusCode::CREATED, data(bursary)))
}

/// PATCH /api/bursaries/{id}
async fn update_bursary(
    State(state): State<Arc<AppState>>,
    Provider(provider): Provider,
    ValidUuid(id): ValidUuid,
    ValidJson(req): ValidJson<BursaryRequest>,
) -> Result<Json<Data<Bursary>>, ApiError> {
    let bursary = BursaryPolicy::new(state.store.as_ref())
        .update(provider, id, req.into())
        .await?;
    Ok(data(bursary))
}

/// PATCH /api/bursaries/{id}/close
async fn close_bursary(
    State(state): State<Arc<AppState>>,
    Provider(provider): Provider,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Data<Bursary>>, ApiError> {
    let bursary = BursaryPolicy::new(state.store.as_ref())
        .close(provider, id)
        .await?;
    Ok(data(bursary))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bursaries", get(list_bursaries).post(create_bursary))
        .route("/bursaries/{id}", patch(update_bursary))
        .route("/bursaries/{id}/close", patch(close_bursary))
}
