//! Typed remote entities
//!
//! Records from the review system and the transfer system come back as
//! loosely structured JSON. Each entity is decoded once, at the client
//! boundary, into a struct with named fields. A missing field is reported
//! as [`Error::FieldMissing`] instead of surfacing later in business logic.

use crate::{Error, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

// ============================================================================
// Record field access
// ============================================================================

/// Walk a dotted path (`asset.parent.link`) into a JSON record
fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |value, key| value.get(key))
        .filter(|value| !value.is_null())
}

/// Required string field
pub fn str_field(record: &Value, entity: &str, path: &str) -> Result<String> {
    match lookup(record, path) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(Error::field_missing(entity, path)),
    }
}

/// Optional string field; absent and `null` both map to `None`
pub fn opt_str_field(record: &Value, path: &str) -> Option<String> {
    lookup(record, path).and_then(|v| v.as_str()).map(str::to_string)
}

/// Required unsigned integer field
pub fn u64_field(record: &Value, entity: &str, path: &str) -> Result<u64> {
    lookup(record, path)
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::field_missing(entity, path))
}

/// Required array field
pub fn array_field<'a>(record: &'a Value, entity: &str, path: &str) -> Result<&'a [Value]> {
    lookup(record, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| Error::field_missing(entity, path))
}

/// Double-quoted literal for a remote filter expression
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

// ============================================================================
// Review system entities
// ============================================================================

/// A named collection of asset versions shared with invitees
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSession {
    pub id: String,
    pub name: String,
    pub project_name: String,
    pub objects: Vec<ReviewSessionObject>,
    pub invitees: Vec<Invitee>,
}

impl ReviewSession {
    /// Decode the session header record (`id`, `name`, `project.name`)
    ///
    /// Objects and invitees are fetched separately and attached by the
    /// caller.
    pub fn from_record(record: &Value) -> Result<Self> {
        Ok(Self {
            id: str_field(record, "ReviewSession", "id")?,
            name: str_field(record, "ReviewSession", "name")?,
            project_name: str_field(record, "ReviewSession", "project.name")?,
            objects: Vec::new(),
            invitees: Vec::new(),
        })
    }

    /// Invitee email addresses in session order
    pub fn invitee_emails(&self) -> Vec<String> {
        self.invitees.iter().map(|i| i.email.clone()).collect()
    }
}

/// One reviewed asset version inside a review session
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSessionObject {
    pub asset_version: AssetVersion,
}

impl ReviewSessionObject {
    pub fn from_record(record: &Value) -> Result<Self> {
        let version = record
            .get("asset_version")
            .filter(|v| !v.is_null())
            .ok_or_else(|| Error::field_missing("ReviewSessionObject", "asset_version"))?;
        Ok(Self {
            asset_version: AssetVersion::from_record(version)?,
        })
    }
}

/// Person invited to a review session
#[derive(Debug, Clone, PartialEq)]
pub struct Invitee {
    pub email: String,
    pub name: Option<String>,
}

impl Invitee {
    pub fn from_record(record: &Value) -> Result<Self> {
        Ok(Self {
            email: str_field(record, "ReviewSessionInvitee", "email")?,
            name: opt_str_field(record, "name"),
        })
    }
}

/// A published version of an asset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetVersion {
    pub id: String,
    pub version: u64,
    pub task_name: Option<String>,
    /// Names of the context chain the asset lives under (project → shot)
    pub context_links: Vec<String>,
}

impl AssetVersion {
    pub fn from_record(record: &Value) -> Result<Self> {
        let context_links = match lookup(record, "asset.parent.link") {
            Some(Value::Array(links)) => links
                .iter()
                .map(|link| str_field(link, "Context", "name"))
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        Ok(Self {
            id: str_field(record, "AssetVersion", "id")?,
            version: u64_field(record, "AssetVersion", "version")?,
            task_name: opt_str_field(record, "task.name"),
            context_links,
        })
    }

    /// Human readable identifier used in log messages, e.g. `show_sq01_sh010_comp_v003`
    pub fn ident(&self) -> String {
        let mut parts: Vec<String> = self.context_links.clone();
        if let Some(task) = &self.task_name {
            parts.push(task.clone());
        }
        parts.push(format!("v{:03}", self.version));
        parts.join("_")
    }
}

/// A published artifact (file or file sequence) attached to a version
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: String,
    pub name: String,
    /// Candidate storage locations in the order the review system lists them
    pub locations: Vec<ComponentLocation>,
}

impl Component {
    pub fn from_record(record: &Value) -> Result<Self> {
        let locations = match lookup(record, "component_locations") {
            Some(Value::Array(items)) => items
                .iter()
                .map(ComponentLocation::from_record)
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        Ok(Self {
            id: str_field(record, "Component", "id")?,
            name: str_field(record, "Component", "name")?,
            locations,
        })
    }
}

/// A component's presence in one location
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentLocation {
    pub location: Location,
    /// Location-relative identifier of the stored bytes
    pub resource_identifier: Option<String>,
}

impl ComponentLocation {
    pub fn from_record(record: &Value) -> Result<Self> {
        let location = record
            .get("location")
            .filter(|v| !v.is_null())
            .ok_or_else(|| Error::field_missing("ComponentLocation", "location"))?;
        Ok(Self {
            location: Location::from_record(location)?,
            resource_identifier: opt_str_field(record, "resource_identifier"),
        })
    }
}

/// Storage backend a component may be stored in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: String,
    pub name: String,
}

impl Location {
    pub fn from_record(record: &Value) -> Result<Self> {
        Ok(Self {
            id: str_field(record, "Location", "id")?,
            name: str_field(record, "Location", "name")?,
        })
    }
}

/// Status of a progress job record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

/// Encode a human readable progress description the way job records store it
pub fn job_description(text: &str) -> String {
    serde_json::json!({ "description": text }).to_string()
}

// ============================================================================
// Transfer system entities
// ============================================================================

/// Named, path-rooted storage root on the transfer system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub id: String,
    pub code: String,
    pub path: Option<String>,
}

impl Share {
    pub fn from_record(record: &Value) -> Result<Self> {
        Ok(Self {
            id: str_field(record, "Share", "id")?,
            code: str_field(record, "Share", "code")?,
            path: opt_str_field(record, "path"),
        })
    }
}

/// Where a task's bytes land: first on the share, then at the recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// `share=<name>/<directory>/<entry>` hop on the transfer server
    pub intermediate: String,
    /// `<directory>/<entry>` relative to the recipient's download root
    pub final_path: String,
}

impl Destination {
    /// Wire form understood by the transfer system: `intermediate:final`
    pub fn locator(&self) -> String {
        format!("{}:{}", self.intermediate, self.final_path)
    }
}

impl Serialize for Destination {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.locator())
    }
}

/// One source → destination instruction within a transfer job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferTask {
    pub source: String,
    pub destination: Destination,
    /// Higher is sent first; `None` leaves ordering to the transfer system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

/// Transfer job submitted once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferJob {
    pub name: String,
    pub tasks: Vec<TransferTask>,
    pub recipients: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("show-review"), "\"show-review\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
        assert_eq!(quote("x\\\""), "\"x\\\\\\\"\"");
    }

    #[test]
    fn test_review_session_from_record() {
        let record = json!({"id": "rs1", "name": "Client Review", "project": {"name": "show"}});
        let session = ReviewSession::from_record(&record).unwrap();
        assert_eq!(session.id, "rs1");
        assert_eq!(session.project_name, "show");
        assert!(session.objects.is_empty());
    }

    #[test]
    fn test_missing_nested_field_is_typed() {
        let record = json!({"id": "rs1", "name": "Client Review", "project": null});
        match ReviewSession::from_record(&record) {
            Err(Error::FieldMissing { entity, field }) => {
                assert_eq!(entity, "ReviewSession");
                assert_eq!(field, "project.name");
            }
            other => panic!("expected FieldMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_asset_version_ident() {
        let record = json!({
            "id": "v1",
            "version": 3,
            "task": {"name": "comp"},
            "asset": {"parent": {"link": [{"name": "show"}, {"name": "sh010"}]}}
        });
        let version = AssetVersion::from_record(&record).unwrap();
        assert_eq!(version.ident(), "show_sh010_comp_v003");
    }

    #[test]
    fn test_asset_version_without_task_or_context() {
        let version = AssetVersion::from_record(&json!({"id": "v1", "version": 12})).unwrap();
        assert_eq!(version.ident(), "v012");
    }

    #[test]
    fn test_component_locations_keep_order() {
        let record = json!({
            "id": "c1",
            "name": "main",
            "component_locations": [
                {"resource_identifier": null, "location": {"id": "l1", "name": "ftrack.server"}},
                {"resource_identifier": "show/a.mov", "location": {"id": "l2", "name": "studio.disk"}}
            ]
        });
        let component = Component::from_record(&record).unwrap();
        assert_eq!(component.locations.len(), 2);
        assert_eq!(component.locations[0].location.name, "ftrack.server");
        assert_eq!(component.locations[0].resource_identifier, None);
        assert_eq!(
            component.locations[1].resource_identifier.as_deref(),
            Some("show/a.mov")
        );
    }

    #[test]
    fn test_transfer_job_wire_format() {
        let job = TransferJob {
            name: "Client Review".to_string(),
            tasks: vec![
                TransferTask {
                    source: "client=abc:/show/a.mov".to_string(),
                    destination: Destination {
                        intermediate: "share=rev/20240101/a.mov".to_string(),
                        final_path: "20240101/a.mov".to_string(),
                    },
                    priority: Some(999),
                },
                TransferTask {
                    source: "/show/seq".to_string(),
                    destination: Destination {
                        intermediate: "share=rev/20240101/seq".to_string(),
                        final_path: "20240101/seq".to_string(),
                    },
                    priority: None,
                },
            ],
            recipients: vec!["a@x.com".to_string()],
        };

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(
            value["tasks"][0]["destination"],
            "share=rev/20240101/a.mov:20240101/a.mov"
        );
        assert_eq!(value["tasks"][0]["priority"], 999);
        assert!(value["tasks"][1].get("priority").is_none());
        assert_eq!(value["recipients"][0], "a@x.com");
    }

    #[test]
    fn test_job_description_is_json() {
        let encoded = job_description("Harvesting components..");
        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded["description"], "Harvesting components..");
    }
}
