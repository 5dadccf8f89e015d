//! Transfer system collaborator
//!
//! Shares are intermediate storage roots on the transfer server; a job
//! moves files from the source party through a share to the recipients.

mod api_client;

pub use api_client::{TransferApiClient, TransferApiConnector};

use async_trait::async_trait;
use revdist_common::models::{Share, TransferJob};
use revdist_common::Result;
use std::sync::Arc;

/// Session with the transfer system
#[async_trait]
pub trait TransferSystem: Send + Sync {
    /// Look up a share by its unique code
    async fn find_share(&self, code: &str) -> Result<Option<Share>>;

    /// Create a share rooted at `path`
    async fn create_share(&self, code: &str, path: &str) -> Result<Share>;

    /// Submit a transfer job, returning its id
    async fn create_job(&self, job: &TransferJob) -> Result<String>;
}

/// Opens fresh transfer system sessions
#[async_trait]
pub trait TransferConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn TransferSystem>>;
}
