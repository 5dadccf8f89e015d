//! Review system collaborator
//!
//! The action reads review sessions, versions and components from the
//! review system, and reports progress back to it through a job record and
//! user-facing notifications.

mod api_client;

pub use api_client::{ReviewApiClient, ReviewApiConnector};

use async_trait::async_trait;
use revdist_common::events::UserMessage;
use revdist_common::models::{Component, JobStatus, ReviewSession};
use revdist_common::Result;
use std::sync::Arc;

/// Change applied to a progress job record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    /// JSON-encoded `{"description": ...}` payload
    pub data: Option<String>,
}

/// Session with the review system
///
/// A session is used from one task at a time; background runs open their
/// own through a [`ReviewConnector`].
#[async_trait]
pub trait ReviewSystem: Send + Sync {
    /// Load a review session with its objects and invitees
    ///
    /// `Ok(None)` when no session has that id.
    async fn load_review_session(&self, id: &str) -> Result<Option<ReviewSession>>;

    /// Components attached to an asset version, with their locations
    async fn components_of_version(&self, version_id: &str) -> Result<Vec<Component>>;

    /// Create a `running` job owned by `user_id`, returning its id
    async fn create_progress_job(&self, user_id: &str, data: &str) -> Result<String>;

    /// Update and commit a job record
    async fn update_progress_job(&self, job_id: &str, update: &JobUpdate) -> Result<()>;

    /// Publish a notification to a user's web client
    async fn publish_user_message(&self, message: &UserMessage) -> Result<()>;
}

/// Opens fresh review system sessions
#[async_trait]
pub trait ReviewConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn ReviewSystem>>;
}
