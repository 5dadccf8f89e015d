//! Distribution run orchestration
//!
//! A run moves through
//! `Init → Validating → Harvesting → ShareCheck → Building → Submitting`
//! and ends in `Done` or `Failed`. It executes on its own tokio task with
//! its own review and transfer sessions, reports progress through a job
//! record in the review system, and sets that record's final status
//! exactly once.

use crate::error::{RunError, ValidationError};
use crate::harvest::{ComponentHarvester, LocationSelector, PathAccessor};
use crate::plan::TransferPlanBuilder;
use crate::review::{JobUpdate, ReviewConnector, ReviewSystem};
use crate::transfer::{TransferConnector, TransferSystem};
use futures::FutureExt;
use revdist_common::events::{LaunchValues, UserMessage};
use revdist_common::models::{job_description, JobStatus, TransferJob};
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

// ============================================================================
// Validation
// ============================================================================

/// Launch values after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionRequest {
    pub recipients: Vec<String>,
    pub share_name: String,
    pub share_path: String,
    pub directory: String,
    pub additional_files: String,
}

impl DistributionRequest {
    /// Validate submitted form values
    ///
    /// Recipients are a comma separated list; every entry must contain `@`
    /// once trimmed.
    pub fn from_values(values: &LaunchValues) -> Result<Self, ValidationError> {
        if values.recipients.trim().is_empty() {
            return Err(ValidationError::NoRecipients);
        }

        let recipients = values
            .recipients
            .split(',')
            .map(|raw| {
                let trimmed = raw.trim();
                if trimmed.is_empty() || !trimmed.contains('@') {
                    Err(ValidationError::InvalidRecipient(raw.to_string()))
                } else {
                    Ok(trimmed.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let share_name = values.share_name.trim();
        if share_name.is_empty() {
            return Err(ValidationError::MissingShareName);
        }

        Ok(Self {
            recipients,
            share_name: share_name.to_string(),
            share_path: values.share_path.trim().to_string(),
            directory: values.directory.trim().to_string(),
            additional_files: values.additional_files.clone(),
        })
    }
}

// ============================================================================
// Run state
// ============================================================================

/// Position of a run in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Validating,
    Harvesting,
    ShareCheck,
    Building,
    Submitting,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "INIT",
            RunState::Validating => "VALIDATING",
            RunState::Harvesting => "HARVESTING",
            RunState::ShareCheck => "SHARE_CHECK",
            RunState::Building => "BUILDING",
            RunState::Submitting => "SUBMITTING",
            RunState::Done => "DONE",
            RunState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Progress job
// ============================================================================

/// Job record the invoking user watches while the run executes
///
/// Consumed by [`ProgressJob::finish`]. A handle dropped without finishing
/// is finalized as failed in the background.
pub struct ProgressJob {
    review: Arc<dyn ReviewSystem>,
    job_id: String,
    user_id: String,
    finished: bool,
}

impl ProgressJob {
    /// Create the record in `running` state
    pub async fn start(
        review: Arc<dyn ReviewSystem>,
        user_id: &str,
    ) -> revdist_common::Result<Self> {
        let job_id = review
            .create_progress_job(user_id, &job_description("Initialising transfer..."))
            .await?;
        info!(job_id = %job_id, "Created progress job");
        Ok(Self {
            review,
            job_id,
            user_id: user_id.to_string(),
            finished: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.job_id
    }

    async fn describe(&self, text: &str) {
        let update = JobUpdate {
            status: None,
            data: Some(job_description(text)),
        };
        if let Err(e) = self.review.update_progress_job(&self.job_id, &update).await {
            warn!(job_id = %self.job_id, error = %e, "Failed to update progress job description");
        }
    }

    pub async fn info(&self, text: &str) {
        info!("{}", text);
        self.describe(text).await;
    }

    pub async fn warning(&self, text: &str) {
        warn!("{}", text);
        self.describe(text).await;
    }

    /// Record a failure and notify the user's web client
    pub async fn error(&self, text: &str) {
        self.warning(text).await;
        let message = UserMessage::for_user(&self.user_id, false, format!("[ERROR] {}", text));
        if let Err(e) = self.review.publish_user_message(&message).await {
            debug!(error = %e, "Ignoring failed user notification");
        }
    }

    /// Set the terminal status
    pub async fn finish(mut self, status: JobStatus) {
        self.finished = true;
        let update = JobUpdate {
            status: Some(status),
            data: None,
        };
        match self.review.update_progress_job(&self.job_id, &update).await {
            Ok(()) => info!(job_id = %self.job_id, status = status.as_str(), "Progress job finalized"),
            Err(e) => error!(
                job_id = %self.job_id,
                status = status.as_str(),
                error = %e,
                "Failed to finalize progress job"
            ),
        }
    }
}

impl Drop for ProgressJob {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        error!(job_id = %self.job_id, "Progress job dropped without a final status, marking failed");

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let review = self.review.clone();
        let job_id = self.job_id.clone();
        handle.spawn(async move {
            let update = JobUpdate {
                status: Some(JobStatus::Failed),
                data: None,
            };
            if let Err(e) = review.update_progress_job(&job_id, &update).await {
                error!(job_id = %job_id, error = %e, "Failed to finalize dropped progress job");
            }
        });
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Everything a background run needs from the launch event
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub user_id: String,
    pub review_session_id: String,
    pub values: LaunchValues,
}

impl RunContext {
    pub fn new(user_id: &str, review_session_id: &str, values: LaunchValues) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            review_session_id: review_session_id.to_string(),
            values,
        }
    }
}

/// How a run ended
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub final_state: RunState,
    /// `None` when the progress job could not be created
    pub progress_job_id: Option<String>,
    /// Submitted transfer job id, or the failure
    pub result: Result<String, RunError>,
}

/// Coordinates harvest, share check, plan building and submission
pub struct DistributionOrchestrator {
    review_connector: Arc<dyn ReviewConnector>,
    transfer_connector: Arc<dyn TransferConnector>,
    accessor: Arc<dyn PathAccessor>,
    excluded_locations: Arc<HashSet<String>>,
    planner: TransferPlanBuilder,
}

impl DistributionOrchestrator {
    pub fn new(
        review_connector: Arc<dyn ReviewConnector>,
        transfer_connector: Arc<dyn TransferConnector>,
        accessor: Arc<dyn PathAccessor>,
        excluded_locations: Arc<HashSet<String>>,
        planner: TransferPlanBuilder,
    ) -> Self {
        Self {
            review_connector,
            transfer_connector,
            accessor,
            excluded_locations,
            planner,
        }
    }

    /// Start a run on its own task and return immediately
    pub fn spawn(self: &Arc<Self>, ctx: RunContext) -> JoinHandle<RunReport> {
        let this = Arc::clone(self);
        let span = info_span!(
            "distribution_run",
            run_id = %ctx.run_id,
            review_session = %ctx.review_session_id
        );
        tokio::spawn(async move { this.run(ctx).await }.instrument(span))
    }

    /// Execute one run to a terminal state
    ///
    /// The progress job, once created, always receives exactly one final
    /// status, including when the run panics.
    pub async fn run(&self, ctx: RunContext) -> RunReport {
        info!(user = %ctx.user_id, "Distribution run started");

        let review = match self.review_connector.connect().await {
            Ok(review) => review,
            Err(e) => {
                error!(error = %e, "Could not open review system session, run aborted");
                return RunReport {
                    run_id: ctx.run_id,
                    final_state: RunState::Failed,
                    progress_job_id: None,
                    result: Err(RunError::Review(e)),
                };
            }
        };

        let job = match ProgressJob::start(review.clone(), &ctx.user_id).await {
            Ok(job) => job,
            Err(e) => {
                error!(error = %e, "Could not create progress job, run aborted");
                let message = UserMessage::for_user(
                    &ctx.user_id,
                    false,
                    "[ERROR] Distribution could not start: failed to create the progress job, see action logs for details",
                );
                if let Err(e) = review.publish_user_message(&message).await {
                    warn!(error = %e, "Could not notify user about aborted run");
                }
                return RunReport {
                    run_id: ctx.run_id,
                    final_state: RunState::Failed,
                    progress_job_id: None,
                    result: Err(RunError::Review(e)),
                };
            }
        };
        let progress_job_id = job.id().to_string();

        let outcome = AssertUnwindSafe(self.execute(&review, &job, &ctx))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(RunError::Crashed(detail))
            }
        };

        let final_state = match &result {
            Ok(transfer_job_id) => {
                info!(transfer_job = %transfer_job_id, "Distribution run finished");
                job.finish(JobStatus::Done).await;
                RunState::Done
            }
            Err(e) => {
                error!(error = ?e, "Distribution run failed");
                job.error(&e.user_message()).await;
                job.finish(JobStatus::Failed).await;
                RunState::Failed
            }
        };

        RunReport {
            run_id: ctx.run_id,
            final_state,
            progress_job_id: Some(progress_job_id),
            result,
        }
    }

    async fn execute(
        &self,
        review: &Arc<dyn ReviewSystem>,
        job: &ProgressJob,
        ctx: &RunContext,
    ) -> Result<String, RunError> {
        let mut state = RunState::Init;

        transition(&mut state, RunState::Validating);
        let request = DistributionRequest::from_values(&ctx.values)?;

        transition(&mut state, RunState::Harvesting);
        job.info("Harvesting components..").await;
        let session = review
            .load_review_session(&ctx.review_session_id)
            .await?
            .ok_or_else(|| {
                revdist_common::Error::NotFound(format!(
                    "Review session {}",
                    ctx.review_session_id
                ))
            })?;
        let harvester = ComponentHarvester::new(
            review.clone(),
            LocationSelector::new(self.accessor.clone(), self.excluded_locations.clone()),
        );
        let harvest = harvester.harvest(&session, &request.additional_files).await?;
        if harvest.is_empty() {
            return Err(RunError::NoFiles);
        }

        transition(&mut state, RunState::ShareCheck);
        let transfer = self
            .transfer_connector
            .connect()
            .await
            .map_err(submission)?;
        self.ensure_share(transfer.as_ref(), job, &request).await?;

        transition(&mut state, RunState::Building);
        job.info(&format!(
            "Building transfer job out of {} file(s)...",
            harvest.file_count()
        ))
        .await;
        let tasks = self.planner.build(
            &harvest.previews,
            &harvest.sequences,
            &request.share_name,
            &request.directory,
        );
        let transfer_job = TransferJob {
            name: session.name.clone(),
            tasks,
            recipients: request.recipients.clone(),
        };

        transition(&mut state, RunState::Submitting);
        job.info(&format!(
            "Submitting transfer job, {} file(s)/directories(s)...",
            transfer_job.tasks.len()
        ))
        .await;
        debug!(payload = ?transfer_job, "Transfer job submit data");
        let transfer_job_id = transfer.create_job(&transfer_job).await.map_err(submission)?;
        job.info(&format!(
            "Submitted (id: {}), check transfer app for progress",
            transfer_job_id
        ))
        .await;

        transition(&mut state, RunState::Done);
        Ok(transfer_job_id)
    }

    /// Look up the share by code and create it when absent
    async fn ensure_share(
        &self,
        transfer: &dyn TransferSystem,
        job: &ProgressJob,
        request: &DistributionRequest,
    ) -> Result<(), RunError> {
        job.info(&format!("Checking share {}...", request.share_name))
            .await;
        match transfer
            .find_share(&request.share_name)
            .await
            .map_err(submission)?
        {
            Some(share) => {
                info!(share = %share.code, share_id = %share.id, "Share exists");
            }
            None => {
                job.warning(&format!(
                    "Share {} does not exist, creating...",
                    request.share_name
                ))
                .await;
                let share = transfer
                    .create_share(&request.share_name, &request.share_path)
                    .await
                    .map_err(submission)?;
                job.info(&format!("Created share {} with id {}.", share.code, share.id))
                    .await;
            }
        }
        Ok(())
    }
}

fn transition(state: &mut RunState, next: RunState) {
    debug!(from = %state, to = %next, "Run state transition");
    *state = next;
}

fn submission(e: revdist_common::Error) -> RunError {
    RunError::Submission(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(recipients: &str, share_name: &str) -> LaunchValues {
        LaunchValues {
            recipients: recipients.to_string(),
            share_name: share_name.to_string(),
            share_path: "show/review".to_string(),
            directory: "20240101/client".to_string(),
            additional_files: String::new(),
        }
    }

    #[test]
    fn test_valid_request_trims_recipients() {
        let request = DistributionRequest::from_values(&values("a@x.com, b@x.com ", " rev ")).unwrap();
        assert_eq!(request.recipients, vec!["a@x.com", "b@x.com"]);
        assert_eq!(request.share_name, "rev");
    }

    #[test]
    fn test_empty_and_malformed_recipients_rejected() {
        let err = DistributionRequest::from_values(&values("a@x.com, ,bad", "rev")).unwrap_err();
        assert_eq!(err, ValidationError::InvalidRecipient(" ".to_string()));

        let err = DistributionRequest::from_values(&values("a@x.com,bad", "rev")).unwrap_err();
        assert_eq!(err, ValidationError::InvalidRecipient("bad".to_string()));
    }

    #[test]
    fn test_no_recipients() {
        assert_eq!(
            DistributionRequest::from_values(&values("  ", "rev")).unwrap_err(),
            ValidationError::NoRecipients
        );
    }

    #[test]
    fn test_missing_share_name() {
        assert_eq!(
            DistributionRequest::from_values(&values("a@x.com", " ")).unwrap_err(),
            ValidationError::MissingShareName
        );
    }

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::ShareCheck.to_string(), "SHARE_CHECK");
        assert_eq!(RunState::Init.to_string(), "INIT");
        assert_eq!(RunState::Failed.to_string(), "FAILED");
    }
}
