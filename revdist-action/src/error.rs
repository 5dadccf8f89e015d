//! Error types for revdist-action
//!
//! Failures a run can recover from locally (a single unresolvable
//! component, a wrong selection) are plain values returned to the caller.
//! Run-level failures are collected in [`RunError`] and reported once at the
//! top of the background run.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Selection that the action does not apply to
///
/// Reported as a benign informational response, never as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Cannot run action - nothing selected!")]
    Empty,

    #[error("Cannot run action - {0} entities selected, select exactly one review session!")]
    Multiple(usize),

    #[error("Can only run action on a review session (got {0})!")]
    WrongEntityType(String),
}

/// Submitted launch values that cannot start a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No recipients!")]
    NoRecipients,

    #[error("Empty or invalid recipient: {0:?}!")]
    InvalidRecipient(String),

    #[error("No intermediate share name given!")]
    MissingShareName,
}

/// A component's path could not be resolved from a location
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationResolutionError {
    /// No filesystem mount is configured for the location
    #[error("no filesystem mount configured for location {location}")]
    NoMount { location: String },

    /// The location's mount is not reachable from this host
    #[error("location {location} is not reachable at {prefix}")]
    Unreachable { location: String, prefix: String },

    /// The component has no stored resource in the location
    #[error("component has no resource identifier in location {location}")]
    MissingResource { location: String },

    /// Every candidate location was excluded or failed
    #[error("no usable location for component {component}")]
    NoUsableLocation { component: String },
}

/// Run-level failure; ends the run with a failed progress job
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("No preview/sequences/additional files found! Make sure version(s) have published components.")]
    NoFiles,

    /// Share lookup/creation or job submission failed
    #[error("Transfer submission failed: {0}")]
    Submission(String),

    /// Review system unavailable or returned malformed data
    #[error("Review system error: {0}")]
    Review(#[from] revdist_common::Error),

    /// The run panicked
    #[error("Run crashed: {0}")]
    Crashed(String),
}

impl RunError {
    /// Message safe to show to the invoking user
    ///
    /// Full error chains stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            RunError::Validation(e) => e.to_string(),
            RunError::NoFiles => self.to_string(),
            RunError::Submission(_) => {
                "Distribution crashed while talking to the transfer system, see action logs for details"
                    .to_string()
            }
            RunError::Review(_) => {
                "Distribution crashed while talking to the review system, see action logs for details"
                    .to_string()
            }
            RunError::Crashed(_) => {
                "Distribution crashed unexpectedly, see action logs for details".to_string()
            }
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Review system failure while answering synchronously (502)
    #[error("Upstream error: {0}")]
    Upstream(#[from] revdist_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Upstream(ref err) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
