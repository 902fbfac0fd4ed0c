//! Supply-chain inventory event service.
//!
//! Ingests inventory observations over HTTP, classifies them under the
//! deployment's [`classify::StatusPolicy`], stores them through an injected
//! [`store::RecordStore`], and serves the most recent records to dashboards.
//! The [`simulator`] module drives the API with synthetic events.

pub mod classify;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod simulator;
pub mod store;
pub mod validation;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::classify::StatusPolicy;
use crate::store::RecordStore;

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub policy: StatusPolicy,
}

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        // ── Health ──────────────────────────────────────────────────────────
        .route("/health", get(handlers::health))

        // ── Ingestion ───────────────────────────────────────────────────────
        .route("/data", post(handlers::data::submit_event))
        .route("/data/submit", post(handlers::data::submit_event))

        // ── Dashboard ───────────────────────────────────────────────────────
        .route("/data/dashboard", get(handlers::data::dashboard))

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Compact `tracing` output, overridable through `RUST_LOG`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .compact()
        .init();
}
