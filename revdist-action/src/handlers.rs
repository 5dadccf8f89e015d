//! Discovery and launch handling
//!
//! Discovery advertises the action for a single selected review session.
//! Launch either returns the confirmation form (first call) or validates
//! the submitted form and starts a background run (second call).

use crate::error::{ApiError, ApiResult, SelectionError};
use crate::orchestrator::{DistributionOrchestrator, DistributionRequest, RunContext, RunReport};
use crate::review::ReviewConnector;
use chrono::NaiveDate;
use revdist_common::events::{
    ActionItem, ActionResponse, DiscoverEvent, LaunchEvent, SelectedEntity, Widget,
    REVIEW_SESSION_ENTITY,
};
use revdist_common::models::ReviewSession;
use revdist_common::path;
use std::path::MAIN_SEPARATOR;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Identifier the action is advertised and launched under
pub const ACTION_IDENTIFIER: &str = "revdist.review-distribute.v1";

/// Label shown in the action menu
pub const ACTION_LABEL: &str = "Review session distribute";

/// The one review session a selection must consist of
pub fn check_selection(selection: &[SelectedEntity]) -> Result<&SelectedEntity, SelectionError> {
    match selection {
        [] => Err(SelectionError::Empty),
        [selected] if selected.entity_type.eq_ignore_ascii_case(REVIEW_SESSION_ENTITY) => {
            Ok(selected)
        }
        [selected] => Err(SelectionError::WrongEntityType(selected.entity_type.clone())),
        many => Err(SelectionError::Multiple(many.len())),
    }
}

/// Answer a discovery event
pub fn discover(event: &DiscoverEvent) -> ActionResponse {
    debug!(selection = ?event.data.selection, "Discover");
    match check_selection(&event.data.selection) {
        Ok(_) => ActionResponse::Items {
            items: vec![ActionItem {
                label: ACTION_LABEL.to_string(),
                action_identifier: ACTION_IDENTIFIER.to_string(),
            }],
        },
        Err(e) => {
            info!(reason = %e, "Action not applicable to selection");
            ActionResponse::success(e.to_string())
        }
    }
}

/// Pre-filled form values inferred from the review session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDefaults {
    pub recipients: String,
    pub share_name: String,
    pub share_path: String,
    pub directory: String,
}

impl FormDefaults {
    pub fn for_session(session: &ReviewSession, today: NaiveDate) -> Self {
        let session_dir = session.name.to_lowercase().replace(' ', "_");
        Self {
            recipients: session.invitee_emails().join(","),
            share_name: format!("{}-review", session.project_name),
            share_path: format!("{}{}review", session.project_name, MAIN_SEPARATOR),
            directory: path::join(&[&today.format("%Y%m%d").to_string(), &session_dir]),
        }
    }
}

/// Confirmation form shown before distributing
pub fn launch_form(defaults: &FormDefaults) -> Vec<Widget> {
    vec![
        Widget::Label {
            value: "This action distributes files from components @ review session \
                    versions to participants:<br><br>\
                    <ul>\
                    <li>Harvests all components from review session versions.</li>\
                    <li>Extracts previews (.mov|.mp4).</li>\
                    <li>Extracts file sequences (.exr|.dpx|.tif(f)|.jpg).</li>\
                    <li>Makes sure a review share exists on the transfer server.</li>\
                    <li>Creates a transfer job to the review session participants.</li>\
                    </ul><br><br>\
                    Please confirm recipients and intermediate share:"
                .to_string(),
        },
        Widget::Text {
            label: "Recipients (comma separated list of email addresses):".to_string(),
            name: "recipients".to_string(),
            value: defaults.recipients.clone(),
        },
        Widget::Text {
            label: "Intermediate share name:".to_string(),
            name: "share_name".to_string(),
            value: defaults.share_name.clone(),
        },
        Widget::Text {
            label: "Intermediate share path:".to_string(),
            name: "share_path".to_string(),
            value: defaults.share_path.clone(),
        },
        Widget::Text {
            label: "Intermediate directory:".to_string(),
            name: "directory".to_string(),
            value: defaults.directory.clone(),
        },
        Widget::Textarea {
            label: "Additional files (one entry per row):".to_string(),
            name: "additional_files".to_string(),
            value: String::new(),
        },
    ]
}

/// Result of a launch: the synchronous response and the started run, if any
#[derive(Debug)]
pub struct Launched {
    pub response: ActionResponse,
    pub run: Option<JoinHandle<RunReport>>,
}

impl Launched {
    fn respond(response: ActionResponse) -> Self {
        Self { response, run: None }
    }
}

/// Handles launch events
pub struct LaunchHandler {
    review_connector: Arc<dyn ReviewConnector>,
    orchestrator: Arc<DistributionOrchestrator>,
}

impl LaunchHandler {
    pub fn new(
        review_connector: Arc<dyn ReviewConnector>,
        orchestrator: Arc<DistributionOrchestrator>,
    ) -> Self {
        Self {
            review_connector,
            orchestrator,
        }
    }

    /// Answer a launch event
    ///
    /// `today` dates the default share directory.
    pub async fn launch(&self, event: &LaunchEvent, today: NaiveDate) -> ApiResult<Launched> {
        if event.data.action_identifier != ACTION_IDENTIFIER {
            return Err(ApiError::BadRequest(format!(
                "Unknown action identifier: {}",
                event.data.action_identifier
            )));
        }

        let selected = match check_selection(&event.data.selection) {
            Ok(selected) => selected,
            Err(e) => return Ok(Launched::respond(ActionResponse::failure(e.to_string()))),
        };
        info!(review_session = %selected.entity_id, user = %event.source.user.id, "Launch");

        let review = self.review_connector.connect().await?;
        let Some(session) = review.load_review_session(&selected.entity_id).await? else {
            return Ok(Launched::respond(ActionResponse::failure(
                "Review session could not be loaded!",
            )));
        };
        if session.objects.is_empty() {
            return Ok(Launched::respond(ActionResponse::failure(
                "Review session is empty - contains no versions!",
            )));
        }
        if session.invitees.is_empty() {
            return Ok(Launched::respond(ActionResponse::failure(
                "Review session has no invitees/collaborators!",
            )));
        }

        let Some(values) = &event.data.values else {
            let defaults = FormDefaults::for_session(&session, today);
            return Ok(Launched::respond(ActionResponse::Form {
                items: launch_form(&defaults),
            }));
        };

        if let Err(e) = DistributionRequest::from_values(values) {
            info!(reason = %e, "Rejected launch values");
            return Ok(Launched::respond(ActionResponse::failure(e.to_string())));
        }

        let ctx = RunContext::new(&event.source.user.id, &session.id, values.clone());
        info!(run_id = %ctx.run_id, "Starting distribution run");
        let run = self.orchestrator.spawn(ctx);

        Ok(Launched {
            response: ActionResponse::success(
                "Distribution of version(s) initiated, check job and transfer app for progress!",
            ),
            run: Some(run),
        })
    }
}
