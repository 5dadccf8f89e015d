//! Action event endpoints
//!
//! An event-hub relay forwards `ftrack.action.discover` and
//! `ftrack.action.launch` events here and hands the JSON answer back as the
//! event reply. The relay polls `/health` to learn which action this
//! process answers for.

use axum::{extract::State, Json};
use revdist_common::events::{ActionResponse, DiscoverEvent, LaunchEvent};
use serde::Serialize;

use crate::error::ApiResult;
use crate::handlers::{self, ACTION_IDENTIFIER};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub action: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        action: ACTION_IDENTIFIER,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /action/discover
pub async fn discover_action(Json(event): Json<DiscoverEvent>) -> Json<ActionResponse> {
    Json(handlers::discover(&event))
}

/// POST /action/launch
///
/// Returns as soon as the run is started; the run itself reports through
/// its progress job.
pub async fn launch_action(
    State(state): State<AppState>,
    Json(event): Json<LaunchEvent>,
) -> ApiResult<Json<ActionResponse>> {
    let today = chrono::Local::now().date_naive();
    let launched = state.launcher.launch(&event, today).await?;
    Ok(Json(launched.response))
}
