//! HTTP surface
//!
//! `POST /analyze` accepts a multipart `image` field and returns the
//! generated commentary. `GET /test-db` is mounted only when a usage store
//! is configured.

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::dispatch::FallbackDispatcher;
use crate::usage::UsageStore;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared, immutable per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<FallbackDispatcher>,
    pub usage: Option<Arc<dyn UsageStore>>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let mut router = Router::new().route("/analyze", post(handlers::analyze));
    if state.usage.is_some() {
        router = router.route("/test-db", get(handlers::test_db));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    router
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
