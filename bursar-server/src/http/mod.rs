//! HTTP server layer
//!
//! Axum server with:
//! - CORS from `CORS_ORIGIN`
//! - Request tracing
//! - Graceful shutdown
//! - JSON `{data}` / `{message}` envelopes

pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

pub use error::ApiError;
pub use server::{build_router, run_server, AppState, ServerError};

/// Successful resource response body
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

pub(crate) fn data<T: Serialize>(data: T) -> Json<Data<T>> {
    Json(Data { data })
}

/// Acknowledgement-only response body
pub(crate) fn message(message: &str) -> Json<Value> {
    Json(json!({ "message": message }))
}
