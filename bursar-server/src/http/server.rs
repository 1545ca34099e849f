//! Axum server setup
//!
//! Server skeleton with:
//! - CORS from settings (`*` allows any origin)
//! - Tracing middleware
//! - Error detail (`stack`) outside production
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::HeaderValue;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::{ApiError, ErrorDetail};
use super::routes;
use crate::auth::TokenService;
use crate::config::Settings;
use crate::store::Store;
use crate::uploads::DocumentStore;

/// JSON body limit for every route except document upload
const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// Multipart framing allowance on top of the file size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state, built once at startup
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub uploads: DocumentStore,
    pub settings: Settings,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: TokenService,
        uploads: DocumentStore,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            tokens,
            uploads,
            settings,
        }
    }

    /// State wired from settings alone: token service and upload store
    /// both come from the configured values.
    pub fn from_settings(store: Arc<dyn Store>, settings: Settings) -> Self {
        let tokens = TokenService::new(settings.jwt_secret.as_bytes(), settings.jwt_expires_in);
        let uploads = DocumentStore::new(settings.upload_dir.clone(), settings.max_upload_bytes());
        Self::new(store, tokens, uploads, settings)
    }
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Result<Router, ServerError> {
    let cors = cors_layer(&state.settings.cors_origin)?;
    let upload_limit = usize::try_from(state.uploads.max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let api = Router::new()
        .merge(routes::auth::router())
        .merge(routes::bursaries::router())
        .merge(routes::applications::router(upload_limit))
        .merge(routes::profiles::router())
        .merge(routes::social::router());

    Ok(Router::new()
        .merge(routes::health::router())
        .nest("/api", api)
        .fallback(route_not_found)
        .layer(middleware::map_response_with_state(
            state.clone(),
            attach_error_detail,
        ))
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Run the HTTP server.
///
/// # Example
///
/// ```ignore
/// let settings = Settings::from_env()?;
/// let store = Arc::new(PgStore::new(create_pool(&url, 5).await?));
/// run_server(Arc::new(AppState::from_settings(store, settings))).await?;
/// ```
pub async fn run_server(state: Arc<AppState>) -> Result<(), ServerError> {
    let bind_addr = state.settings.bind_addr;
    tokio::fs::create_dir_all(state.uploads.dir()).await?;
    tracing::info!(upload_dir = %state.uploads.dir().display(), "upload directory ready");

    let app = build_router(state)?;

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn cors_layer(origin: &str) -> Result<CorsLayer, ServerError> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin.trim() == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origin
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| {
            HeaderValue::from_str(o).map_err(|_| ServerError::InvalidCorsOrigin(o.to_owned()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(origins))
}

async fn route_not_found() -> ApiError {
    ApiError::route_not_found()
}

/// Rewrite error bodies to carry `stack` when not running in production.
async fn attach_error_detail(State(state): State<Arc<AppState>>, mut response: Response) -> Response {
    let Some(detail) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };
    if !state.settings.expose_error_detail() {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    let body = Json(json!({ "message": detail.message, "stack": detail.stack }));
    (parts, body).into_response()
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::warn!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::warn!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid CORS origin '{0}'")]
    InvalidCorsOrigin(String),
}
