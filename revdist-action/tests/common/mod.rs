//! In-memory review and transfer systems for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use revdist_action::error::LocationResolutionError;
use revdist_action::handlers::{LaunchHandler, ACTION_IDENTIFIER};
use revdist_action::harvest::PathAccessor;
use revdist_action::orchestrator::DistributionOrchestrator;
use revdist_action::plan::{SourceParty, TransferPlanBuilder};
use revdist_action::review::{JobUpdate, ReviewConnector, ReviewSystem};
use revdist_action::transfer::{TransferConnector, TransferSystem};
use revdist_common::config::DEFAULT_EXCLUDED_LOCATIONS;
use revdist_common::events::{
    EventSource, EventUser, LaunchData, LaunchEvent, LaunchValues, SelectedEntity, UserMessage,
};
use revdist_common::models::{
    AssetVersion, Component, ComponentLocation, Invitee, JobStatus, Location, ReviewSession,
    ReviewSessionObject, Share, TransferJob,
};
use revdist_common::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// Review system
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct FakeJob {
    pub id: String,
    pub user_id: String,
    /// Status writes after creation
    pub statuses: Vec<JobStatus>,
    pub descriptions: Vec<String>,
}

#[derive(Default)]
pub struct FakeReview {
    pub sessions: Mutex<HashMap<String, ReviewSession>>,
    pub components: Mutex<HashMap<String, Vec<Component>>>,
    pub jobs: Mutex<Vec<FakeJob>>,
    pub messages: Mutex<Vec<UserMessage>>,
    pub panic_on_components: AtomicBool,
    pub fail_job_creation: AtomicBool,
}

impl FakeReview {
    pub fn add_session(&self, session: ReviewSession) {
        self.sessions.lock().unwrap().insert(session.id.clone(), session);
    }

    pub fn add_components(&self, version_id: &str, components: Vec<Component>) {
        self.components
            .lock()
            .unwrap()
            .insert(version_id.to_string(), components);
    }

    pub fn jobs(&self) -> Vec<FakeJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<UserMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewSystem for FakeReview {
    async fn load_review_session(&self, id: &str) -> Result<Option<ReviewSession>> {
        Ok(self.sessions.lock().unwrap().get(id).cloned())
    }

    async fn components_of_version(&self, version_id: &str) -> Result<Vec<Component>> {
        if self.panic_on_components.load(Ordering::SeqCst) {
            panic!("component query exploded");
        }
        Ok(self
            .components
            .lock()
            .unwrap()
            .get(version_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_progress_job(&self, user_id: &str, data: &str) -> Result<String> {
        if self.fail_job_creation.load(Ordering::SeqCst) {
            return Err(Error::Remote("Job entity is read-only".to_string()));
        }
        let mut jobs = self.jobs.lock().unwrap();
        let id = format!("job-{}", jobs.len() + 1);
        jobs.push(FakeJob {
            id: id.clone(),
            user_id: user_id.to_string(),
            statuses: Vec::new(),
            descriptions: vec![data.to_string()],
        });
        Ok(id)
    }

    async fn update_progress_job(&self, job_id: &str, update: &JobUpdate) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::NotFound(job_id.to_string()))?;
        if let Some(status) = update.status {
            job.statuses.push(status);
        }
        if let Some(data) = &update.data {
            job.descriptions.push(data.clone());
        }
        Ok(())
    }

    async fn publish_user_message(&self, message: &UserMessage) -> Result<()> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub struct FakeReviewConnector {
    pub review: Arc<FakeReview>,
    pub connects: AtomicUsize,
}

#[async_trait]
impl ReviewConnector for FakeReviewConnector {
    async fn connect(&self) -> Result<Arc<dyn ReviewSystem>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.review.clone())
    }
}

// =============================================================================
// Transfer system
// =============================================================================

#[derive(Default)]
pub struct FakeTransfer {
    pub shares: Mutex<HashMap<String, Share>>,
    /// (code, path) of every create_share call
    pub created_shares: Mutex<Vec<(String, String)>>,
    pub jobs: Mutex<Vec<TransferJob>>,
    pub fail_jobs: AtomicBool,
}

impl FakeTransfer {
    pub fn jobs(&self) -> Vec<TransferJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn created_shares(&self) -> Vec<(String, String)> {
        self.created_shares.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferSystem for FakeTransfer {
    async fn find_share(&self, code: &str) -> Result<Option<Share>> {
        Ok(self.shares.lock().unwrap().get(code).cloned())
    }

    async fn create_share(&self, code: &str, path: &str) -> Result<Share> {
        let share = Share {
            id: format!("share-{}", code),
            code: code.to_string(),
            path: Some(path.to_string()),
        };
        self.shares
            .lock()
            .unwrap()
            .insert(code.to_string(), share.clone());
        self.created_shares
            .lock()
            .unwrap()
            .push((code.to_string(), path.to_string()));
        Ok(share)
    }

    async fn create_job(&self, job: &TransferJob) -> Result<String> {
        if self.fail_jobs.load(Ordering::SeqCst) {
            return Err(Error::Remote(
                "Transfer API returned error 500: license expired".to_string(),
            ));
        }
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(job.clone());
        Ok(format!("tjob-{}", jobs.len()))
    }
}

pub struct FakeTransferConnector {
    pub transfer: Arc<FakeTransfer>,
}

#[async_trait]
impl TransferConnector for FakeTransferConnector {
    async fn connect(&self) -> Result<Arc<dyn TransferSystem>> {
        Ok(self.transfer.clone())
    }
}

// =============================================================================
// Filesystem
// =============================================================================

/// `/mnt/<location>/<resource>`; locations named `broken.*` always fail
pub struct FakeAccessor;

impl PathAccessor for FakeAccessor {
    fn filesystem_path(
        &self,
        _component: &Component,
        entry: &ComponentLocation,
    ) -> std::result::Result<String, LocationResolutionError> {
        let location = &entry.location.name;
        if location.starts_with("broken.") {
            return Err(LocationResolutionError::Unreachable {
                location: location.clone(),
                prefix: format!("/mnt/{}", location),
            });
        }
        let resource = entry.resource_identifier.clone().ok_or_else(|| {
            LocationResolutionError::MissingResource {
                location: location.clone(),
            }
        })?;
        Ok(format!("/mnt/{}/{}", location, resource))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn component(id: &str, locations: &[(&str, &str)]) -> Component {
    Component {
        id: id.to_string(),
        name: format!("component-{}", id),
        locations: locations
            .iter()
            .map(|(location, resource)| ComponentLocation {
                location: Location {
                    id: format!("loc-{}", location),
                    name: location.to_string(),
                },
                resource_identifier: Some(resource.to_string()),
            })
            .collect(),
    }
}

pub fn version(id: &str, number: u64) -> ReviewSessionObject {
    ReviewSessionObject {
        asset_version: AssetVersion {
            id: id.to_string(),
            version: number,
            task_name: Some("comp".to_string()),
            context_links: vec!["show".to_string(), format!("sh{}", id)],
        },
    }
}

pub fn review_session(id: &str, version_ids: &[&str], invitees: &[&str]) -> ReviewSession {
    ReviewSession {
        id: id.to_string(),
        name: "Client Review".to_string(),
        project_name: "show".to_string(),
        objects: version_ids
            .iter()
            .enumerate()
            .map(|(i, v)| version(v, i as u64 + 1))
            .collect(),
        invitees: invitees
            .iter()
            .map(|email| Invitee {
                email: email.to_string(),
                name: None,
            })
            .collect(),
    }
}

pub fn launch_values(recipients: &str, share_name: &str) -> LaunchValues {
    LaunchValues {
        recipients: recipients.to_string(),
        share_name: share_name.to_string(),
        share_path: "show/review".to_string(),
        directory: "20240307/client_review".to_string(),
        additional_files: String::new(),
    }
}

pub fn launch_event(session_id: &str, values: Option<LaunchValues>) -> LaunchEvent {
    LaunchEvent {
        data: LaunchData {
            action_identifier: ACTION_IDENTIFIER.to_string(),
            selection: vec![SelectedEntity {
                entity_id: session_id.to_string(),
                entity_type: "reviewsession".to_string(),
            }],
            values,
        },
        source: EventSource {
            user: EventUser {
                id: "user-1".to_string(),
                username: Some("jane".to_string()),
            },
        },
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub review: Arc<FakeReview>,
    pub review_connector: Arc<FakeReviewConnector>,
    pub transfer: Arc<FakeTransfer>,
    pub orchestrator: Arc<DistributionOrchestrator>,
    pub launcher: Arc<LaunchHandler>,
}

impl Harness {
    pub fn new(source_party: SourceParty) -> Self {
        let review = Arc::new(FakeReview::default());
        let review_connector = Arc::new(FakeReviewConnector {
            review: review.clone(),
            connects: AtomicUsize::new(0),
        });
        let transfer = Arc::new(FakeTransfer::default());
        let excluded: HashSet<String> = DEFAULT_EXCLUDED_LOCATIONS
            .iter()
            .map(|s| s.to_string())
            .collect();

        let orchestrator = Arc::new(DistributionOrchestrator::new(
            review_connector.clone(),
            Arc::new(FakeTransferConnector {
                transfer: transfer.clone(),
            }),
            Arc::new(FakeAccessor),
            Arc::new(excluded),
            TransferPlanBuilder::new(source_party),
        ));
        let launcher = Arc::new(LaunchHandler::new(
            review_connector.clone(),
            orchestrator.clone(),
        ));

        Self {
            review,
            review_connector,
            transfer,
            orchestrator,
            launcher,
        }
    }
}
