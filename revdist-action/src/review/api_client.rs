//! Review system REST client
//!
//! The review system exposes a single batched operations endpoint:
//! `POST {server}/api` with a JSON array of `query`/`create`/`update`
//! operations, answered by an array of results in the same order.
//!
//! # API Reference
//! - Auth headers: `ftrack-user`, `ftrack-api-key`
//! - Query result: `{"action": "query", "data": [...]}`
//! - Create result: `{"action": "create", "data": {...}}`

use super::{JobUpdate, ReviewConnector, ReviewSystem};
use async_trait::async_trait;
use reqwest::{header, Client};
use revdist_common::config::ReviewConfig;
use revdist_common::events::UserMessage;
use revdist_common::models::{
    quote, Component, Invitee, JobStatus, ReviewSession, ReviewSessionObject,
};
use revdist_common::{Error, Result};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Review system API client
pub struct ReviewApiClient {
    http_client: Client,
    api_url: String,
    event_relay_url: Option<String>,
}

impl ReviewApiClient {
    /// Create a client with its own connection pool
    pub fn new(config: &ReviewConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "ftrack-user",
            header::HeaderValue::from_str(&config.api_user)
                .map_err(|e| Error::Config(format!("Invalid review.api_user: {}", e)))?,
        );
        let mut key = header::HeaderValue::from_str(&config.api_key)
            .map_err(|e| Error::Config(format!("Invalid review.api_key: {}", e)))?;
        key.set_sensitive(true);
        headers.insert("ftrack-api-key", key);

        let http_client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http_client,
            api_url: format!("{}/api", config.server_url.trim_end_matches('/')),
            event_relay_url: config
                .event_relay_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    /// Send a batch of operations and return one result per operation
    async fn call(&self, operations: Vec<Value>) -> Result<Vec<Value>> {
        let expected = operations.len();
        let response = self
            .http_client
            .post(&self.api_url)
            .json(&operations)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!(
                "Review API returned error {}: {}",
                status, body
            )));
        }

        let body: Value = response.json().await?;
        parse_batch_response(body, expected)
    }

    async fn query(&self, expression: String) -> Result<Vec<Value>> {
        debug!(expression = %expression, "Review system query");
        let mut results = self.call(vec![query_op(expression)]).await?;
        query_data(results.remove(0))
    }
}

#[async_trait]
impl ReviewSystem for ReviewApiClient {
    async fn load_review_session(&self, id: &str) -> Result<Option<ReviewSession>> {
        let id = quote(id);
        let results = self
            .call(vec![
                query_op(format!(
                    "select id, name, project.name from ReviewSession where id is {}",
                    id
                )),
                query_op(format!(
                    "select asset_version.id, asset_version.version, asset_version.task.name, \
                     asset_version.asset.parent.link from ReviewSessionObject \
                     where review_session_id is {} order by sort_order",
                    id
                )),
                query_op(format!(
                    "select email, name from ReviewSessionInvitee where review_session_id is {}",
                    id
                )),
            ])
            .await?;
        parse_review_session(results)
    }

    async fn components_of_version(&self, version_id: &str) -> Result<Vec<Component>> {
        let records = self
            .query(format!(
                "select id, name, component_locations.resource_identifier, \
                 component_locations.location.id, component_locations.location.name \
                 from Component where version_id is {}",
                quote(version_id)
            ))
            .await?;
        records.iter().map(Component::from_record).collect()
    }

    async fn create_progress_job(&self, user_id: &str, data: &str) -> Result<String> {
        let mut results = self
            .call(vec![json!({
                "action": "create",
                "entity_type": "Job",
                "entity_data": {
                    "user_id": user_id,
                    "status": JobStatus::Running.as_str(),
                    "data": data,
                }
            })])
            .await?;
        let created = results.remove(0);
        revdist_common::models::str_field(&created, "Job", "data.id")
    }

    async fn update_progress_job(&self, job_id: &str, update: &JobUpdate) -> Result<()> {
        let mut entity_data = Map::new();
        if let Some(status) = update.status {
            entity_data.insert("status".to_string(), json!(status.as_str()));
        }
        if let Some(data) = &update.data {
            entity_data.insert("data".to_string(), json!(data));
        }
        if entity_data.is_empty() {
            return Ok(());
        }

        self.call(vec![json!({
            "action": "update",
            "entity_type": "Job",
            "entity_key": [job_id],
            "entity_data": entity_data,
        })])
        .await?;
        Ok(())
    }

    async fn publish_user_message(&self, message: &UserMessage) -> Result<()> {
        let Some(relay) = &self.event_relay_url else {
            warn!(
                target_user = %message.target,
                message = %message.data.message,
                "No event relay configured, user notification not delivered"
            );
            return Ok(());
        };

        let response = self
            .http_client
            .post(format!("{}/publish", relay))
            .json(message)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Remote(format!(
                "Event relay returned error {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Opens a new [`ReviewApiClient`] per call
pub struct ReviewApiConnector {
    config: ReviewConfig,
}

impl ReviewApiConnector {
    pub fn new(config: ReviewConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ReviewConnector for ReviewApiConnector {
    async fn connect(&self) -> Result<Arc<dyn ReviewSystem>> {
        Ok(Arc::new(ReviewApiClient::new(&self.config)?))
    }
}

fn query_op(expression: String) -> Value {
    json!({ "action": "query", "expression": expression })
}

/// Check the batch answer shape and surface server-side exceptions
fn parse_batch_response(body: Value, expected: usize) -> Result<Vec<Value>> {
    match body {
        Value::Array(results) if results.len() == expected => Ok(results),
        Value::Array(results) => Err(Error::Remote(format!(
            "Review API returned {} results for {} operations",
            results.len(),
            expected
        ))),
        Value::Object(obj) if obj.contains_key("exception") => Err(Error::Remote(format!(
            "{}: {}",
            obj.get("exception").and_then(Value::as_str).unwrap_or("Exception"),
            obj.get("content").and_then(Value::as_str).unwrap_or_default()
        ))),
        other => Err(Error::Remote(format!(
            "Unexpected review API response: {}",
            other
        ))),
    }
}

/// Records of a query result
fn query_data(result: Value) -> Result<Vec<Value>> {
    match result {
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(Error::field_missing("QueryResult", "data")),
        },
        _ => Err(Error::field_missing("QueryResult", "data")),
    }
}

/// Assemble a session from the header, objects and invitees query results
fn parse_review_session(results: Vec<Value>) -> Result<Option<ReviewSession>> {
    let mut results = results.into_iter();
    let (Some(header), Some(objects), Some(invitees)) =
        (results.next(), results.next(), results.next())
    else {
        return Err(Error::Remote(
            "Incomplete review session query response".to_string(),
        ));
    };

    let headers = query_data(header)?;
    let Some(record) = headers.first() else {
        return Ok(None);
    };

    let mut session = ReviewSession::from_record(record)?;
    session.objects = query_data(objects)?
        .iter()
        .map(ReviewSessionObject::from_record)
        .collect::<Result<Vec<_>>>()?;
    session.invitees = query_data(invitees)?
        .iter()
        .map(Invitee::from_record)
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(session))
}
