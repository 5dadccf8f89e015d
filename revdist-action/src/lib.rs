//! revdist-action library - review session distribution action
//!
//! Harvests preview and sequence files from the versions of a review
//! session and submits a transfer job delivering them to the session's
//! invitees.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod handlers;
pub mod harvest;
pub mod orchestrator;
pub mod plan;
pub mod review;
pub mod transfer;

use handlers::LaunchHandler;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub launcher: Arc<LaunchHandler>,
}

impl AppState {
    /// Create new application state
    pub fn new(launcher: Arc<LaunchHandler>) -> Self {
        Self { launcher }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/action/discover", post(api::discover_action))
        .route("/action/launch", post(api::launch_action))
        .route("/health", get(api::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
