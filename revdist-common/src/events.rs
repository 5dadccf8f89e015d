//! Action event types exchanged with the review system's action framework
//!
//! Discovery events ask "which actions apply to this selection?", launch
//! events run one. Both carry the selection and the invoking user; a launch
//! that follows a form submission also carries the submitted values.

use serde::{Deserialize, Serialize};

/// Entity type the distribution action applies to
pub const REVIEW_SESSION_ENTITY: &str = "reviewsession";

/// One selected entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedEntity {
    pub entity_id: String,
    pub entity_type: String,
}

/// User that triggered the event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Event origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSource {
    pub user: EventUser,
}

/// Payload of a discovery event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiscoverData {
    #[serde(default)]
    pub selection: Vec<SelectedEntity>,
}

/// `ftrack.action.discover`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverEvent {
    #[serde(default)]
    pub data: DiscoverData,
    #[serde(default)]
    pub source: Option<EventSource>,
}

/// Values submitted through the launch form
///
/// All fields are free text exactly as the user typed them; parsing and
/// validation happen in the action.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LaunchValues {
    #[serde(default)]
    pub recipients: String,
    #[serde(default)]
    pub share_name: String,
    #[serde(default)]
    pub share_path: String,
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub additional_files: String,
}

/// Payload of a launch event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchData {
    pub action_identifier: String,
    #[serde(default)]
    pub selection: Vec<SelectedEntity>,
    #[serde(default)]
    pub values: Option<LaunchValues>,
}

/// `ftrack.action.launch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchEvent {
    pub data: LaunchData,
    pub source: EventSource,
}

/// Entry advertised in a discovery response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub label: String,
    pub action_identifier: String,
}

/// Form widget shown before a launch is confirmed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Widget {
    /// Static text (HTML allowed)
    Label { value: String },
    /// Single line input
    Text {
        label: String,
        name: String,
        value: String,
    },
    /// Multi line input
    Textarea {
        label: String,
        name: String,
        value: String,
    },
}

/// Response returned to the action framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionResponse {
    /// Discovery result listing applicable actions
    Items { items: Vec<ActionItem> },
    /// Launch form to be filled in
    Form { items: Vec<Widget> },
    /// Plain acknowledgement or failure message
    Message { success: bool, message: String },
}

impl ActionResponse {
    pub fn success(message: impl Into<String>) -> Self {
        ActionResponse::Message {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ActionResponse::Message {
            success: false,
            message: message.into(),
        }
    }
}

/// User-facing notification published through the event hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub topic: String,
    pub data: UserMessageData,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessageData {
    #[serde(rename = "type")]
    pub kind: String,
    pub success: bool,
    pub message: String,
}

impl UserMessage {
    /// Message shown in the web client of one user
    pub fn for_user(user_id: &str, success: bool, message: impl Into<String>) -> Self {
        Self {
            topic: "ftrack.action.trigger-user-interface".to_string(),
            data: UserMessageData {
                kind: "message".to_string(),
                success,
                message: message.into(),
            },
            target: format!("applicationId=ftrack.client.web and user.id={}", user_id),
        }
    }
}
