//! Local control API
//!
//! The session's user controls exposed as HTTP endpoints.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::Session;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(session: Arc<Session>) -> Router {
    Router::new()
        .route("/timer/start", post(start_handler))
        .route("/timer/pause", post(pause_handler))
        .route("/timer/resume", post(resume_handler))
        .route("/timer/toggle", post(toggle_handler))
        .route("/timer/skip", post(skip_handler))
        .route("/timer/reset", post(reset_handler))
        .route("/timer/settings", put(settings_handler))
        .route("/timer/error", delete(clear_error_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(session)
}
