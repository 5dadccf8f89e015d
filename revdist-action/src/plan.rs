//! Transfer plan building
//!
//! Turns harvested paths into transfer tasks. Each task goes through two
//! hops: the file lands in `share=<share>/<directory>/<entry>` on the
//! transfer server, then travels to `<directory>/<entry>` at every
//! recipient. Previews are single files; a sequence is sent as its whole
//! parent directory.

use revdist_common::models::{Destination, TransferTask};
use revdist_common::path;
use tracing::{debug, warn};

/// Priority given to previews so they arrive before any sequence
pub const PREVIEW_PRIORITY: u32 = 999;

/// Who serves the source files to the transfer system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceParty {
    /// Paths are visible to the transfer server itself
    Server,
    /// A transfer client installed on this host (or one sharing its mounts)
    LocalClient(String),
}

impl SourceParty {
    /// Party for an optional configured client id
    pub fn from_client_id(client_id: Option<&str>) -> Self {
        match client_id {
            Some(id) => SourceParty::LocalClient(id.to_string()),
            None => SourceParty::Server,
        }
    }

    fn locator(&self, path: &str) -> String {
        match self {
            SourceParty::Server => path.to_string(),
            SourceParty::LocalClient(id) => format!("client={}:{}", id, path),
        }
    }
}

/// Builds the ordered task list of a transfer job
#[derive(Debug, Clone)]
pub struct TransferPlanBuilder {
    source_party: SourceParty,
}

impl TransferPlanBuilder {
    pub fn new(source_party: SourceParty) -> Self {
        Self { source_party }
    }

    /// All preview tasks first, then one task per sequence directory
    pub fn build(
        &self,
        previews: &[String],
        sequences: &[String],
        share_name: &str,
        directory: &str,
    ) -> Vec<TransferTask> {
        let preview_tasks = previews.iter().map(|raw| {
            debug!(path = %raw, "Adding preview file");
            let entry = path::basename(&path::normalize(raw));
            TransferTask {
                source: self.source_party.locator(raw),
                destination: destination(share_name, directory, &entry),
                priority: Some(PREVIEW_PRIORITY),
            }
        });

        let sequence_tasks = sequences.iter().filter_map(|raw| {
            let Some(folder) = sequence_folder(raw) else {
                warn!(path = %raw, "Skipping sequence frame without a parent folder");
                return None;
            };
            debug!(path = %raw, "Adding sequence files");
            let entry = path::basename(&folder);
            Some(TransferTask {
                source: self.source_party.locator(&folder),
                destination: destination(share_name, directory, &entry),
                priority: None,
            })
        });

        preview_tasks.chain(sequence_tasks).collect()
    }
}

/// Folder holding the frames of a sequence, in normalized form
///
/// `None` when the frame sits at the filesystem root or has no folder at
/// all, since there is nothing to send as a whole.
pub fn sequence_folder(raw: &str) -> Option<String> {
    let folder = path::dirname(&path::normalize(raw));
    if path::basename(&folder).is_empty() {
        return None;
    }
    Some(folder)
}

fn destination(share_name: &str, directory: &str, entry: &str) -> Destination {
    let final_path = path::join(&[&path::normalize(directory), entry]);
    Destination {
        intermediate: format!("share={}", path::join(&[share_name, &final_path])),
        final_path,
    }
}
