//! Application endpoints, including document upload

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AuthUser, Learner, Provider};
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidUuid};
use crate::http::server::AppState;
use crate::http::{data, Data};
use crate::models::{Application, ApplicationDocument, LearnerApplication, ProviderApplication};
use crate::policy::ApplicationPolicy;
use crate::uploads::{IncomingFile, UploadError};

/// Multipart field carrying the document
const DOCUMENT_FIELD: &str = "document";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub bursary_id: Option<String>,
    pub motivation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

/// POST /api/applications
async fn apply(
    State(state): State<Arc<AppState>>,
    Learner(learner): Learner,
    ValidJson(req): ValidJson<ApplyRequest>,
) -> Result<(StatusCode, Json<Data<Application>>), ApiError> {
    let bursary_id = req
        .bursary_id
        .map(|id| Uuid::parse_str(id.trim()).map_err(|_| ApiError::InvalidIdentifier))
        .transpose()?;
    let application = ApplicationPolicy::new(state.store.as_ref())
        .apply(learner, bursary_id, req.motivation)
        .await?;
    Ok((StatusCode::CREATED, data(application)))
}

/// GET /api/applications/mine
async fn list_mine(
    State(state): State<Arc<AppState>>,
    Learner(learner): Learner,
) -> Result<Json<Data<Vec<LearnerApplication>>>, ApiError> {
    let applications = ApplicationPolicy::new(state.store.as_ref())
        .list_mine(learner)
        .await?;
    Ok(data(applications))
}

/// POST /api/applications/{id}/documents
async fn upload_document(
    State(state): State<Arc<AppState>>,
    Learner(learner): Learner,
    ValidUuid(application_id): ValidUuid,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Data<ApplicationDocument>>), ApiError> {
    // Not a multipart body at all: there is no document.
    let multipart = multipart.map_err(|_| ApiError::Upload(UploadError::Missing))?;
    let file = read_document(multipart, state.uploads.max_bytes()).await?;
    let document = ApplicationPolicy::new(state.store.as_ref())
        .upload_document(learner, application_id, file, &state.uploads)
        .await?;
    Ok((StatusCode::CREATED, data(document)))
}

/// GET /api/applications/{id}/documents
async fn list_documents(
    State(state): State<Arc<AppState>>,
    AuthUser(viewer): AuthUser,
    ValidUuid(application_id): ValidUuid,
) -> Result<Json<Data<Vec<ApplicationDocument>>>, ApiError> {
    let documents = ApplicationPolicy::new(state.store.as_ref())
        .list_documents(viewer, application_id)
        .await?;
    Ok(data(documents))
}

/// GET /api/applications/provider/bursary/{bursaryId}
async fn list_for_bursary(
    State(state): State<Arc<AppState>>,
    Provider(provider): Provider,
    ValidUuid(bursary_id): ValidUuid,
) -> Result<Json<Data<Vec<ProviderApplication>>>, ApiError> {
    let applications = ApplicationPolicy::new(state.store.as_ref())
        .list_for_provider(provider, bursary_id)
        .await?;
    Ok(data(applications))
}

/// PATCH /api/applications/provider/{id}/status
async fn update_status(
    State(state): State<Arc<AppState>>,
    Provider(provider): Provider,
    ValidUuid(application_id): ValidUuid,
    ValidJson(req): ValidJson<StatusRequest>,
) -> Result<Json<Data<Application>>, ApiError> {
    let application = ApplicationPolicy::new(state.store.as_ref())
        .update_status(provider, application_id, req.status)
        .await?;
    Ok(data(application))
}

/// Pull the `document` field out of a multipart body. Other fields are
/// skipped; a body over the route limit counts as a too-large file.
async fn read_document(
    mut multipart: Multipart,
    limit: u64,
) -> Result<Option<IncomingFile>, ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return Err(multipart_error(e, limit)),
        };
        if field.name() != Some(DOCUMENT_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_owned();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

        return Ok(Some(IncomingFile {
            original_name,
            mime_type,
            bytes,
        }));
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError, limit: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(error = %e, "document upload over size limit");
        ApiError::Upload(UploadError::TooLarge { limit })
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

pub fn router(upload_limit: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/applications", post(apply))
        .route("/applications/mine", get(list_mine))
        .route(
            "/applications/{id}/documents",
            get(list_documents)
                .post(upload_document)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/applications/provider/bursary/{bursaryId}",
            get(list_for_bursary),
        )
        .route(
            "/applications/provider/{id}/status",
            patch(update_status),
        )
}
