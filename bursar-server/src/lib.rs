//! bursar-server: bursary management REST backend
//!
//! Providers post bursaries, learners apply and attach documents, and both
//! roles share a small social layer of follows, posts and likes.
//!
//! Layers, outermost first: `http` (axum routes and the error boundary),
//! `auth` (tokens and the request gate), `policy` (ownership and state
//! rules), `store` (PostgreSQL or in-memory persistence), `models`.

pub mod auth;
pub mod config;
pub mod http;
pub mod models;
pub mod policy;
pub mod store;
pub mod uploads;

pub use config::{ConfigError, Environment, Settings};
pub use http::{build_router, run_server, AppState, ServerError};
pub use store::{create_pool, MemoryStore, PgStore, Store, StoreError};
