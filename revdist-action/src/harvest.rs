//! Component harvesting
//!
//! Walks every version of a review session, picks one usable filesystem
//! path per attached component and sorts the paths into previews and
//! sequences. Individual components or versions that yield nothing are
//! logged and skipped; only a failing review system aborts the harvest.

use crate::error::LocationResolutionError;
use crate::plan::sequence_folder;
use crate::review::ReviewSystem;
use revdist_common::models::{Component, ComponentLocation, ReviewSession};
use revdist_common::path::{self, FileKind};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves a component's bytes in one location to a filesystem path
pub trait PathAccessor: Send + Sync {
    fn filesystem_path(
        &self,
        component: &Component,
        entry: &ComponentLocation,
    ) -> Result<String, LocationResolutionError>;
}

/// Disk-backed locations mounted under a per-location prefix on this host
pub struct MountPathAccessor {
    mounts: HashMap<String, PathBuf>,
}

impl MountPathAccessor {
    pub fn new(mounts: HashMap<String, PathBuf>) -> Self {
        Self { mounts }
    }
}

impl PathAccessor for MountPathAccessor {
    fn filesystem_path(
        &self,
        _component: &Component,
        entry: &ComponentLocation,
    ) -> Result<String, LocationResolutionError> {
        let location = &entry.location.name;
        let prefix = self
            .mounts
            .get(location)
            .ok_or_else(|| LocationResolutionError::NoMount {
                location: location.clone(),
            })?;

        if !prefix.is_dir() {
            return Err(LocationResolutionError::Unreachable {
                location: location.clone(),
                prefix: prefix.display().to_string(),
            });
        }

        let resource = entry
            .resource_identifier
            .as_deref()
            .map(|r| r.trim_start_matches(['/', '\\']))
            .filter(|r| !r.is_empty())
            .ok_or_else(|| LocationResolutionError::MissingResource {
                location: location.clone(),
            })?;

        Ok(prefix.join(resource).to_string_lossy().into_owned())
    }
}

/// A component path and the location it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub location: String,
    pub path: String,
}

/// Picks the first usable location of a component
pub struct LocationSelector {
    accessor: Arc<dyn PathAccessor>,
    excluded: Arc<HashSet<String>>,
}

impl LocationSelector {
    pub fn new(accessor: Arc<dyn PathAccessor>, excluded: Arc<HashSet<String>>) -> Self {
        Self { accessor, excluded }
    }

    /// First path resolved from a non-excluded location, in listed order
    ///
    /// A location that fails to resolve is logged and the next one is tried.
    pub fn resolve_component_path(
        &self,
        component: &Component,
    ) -> Result<ResolvedPath, LocationResolutionError> {
        for entry in &component.locations {
            let location = &entry.location.name;
            if self.excluded.contains(location) {
                continue;
            }

            match self.accessor.filesystem_path(component, entry) {
                Ok(path) if !path.is_empty() => {
                    return Ok(ResolvedPath {
                        location: location.clone(),
                        path,
                    });
                }
                Ok(_) => {
                    debug!(component = %component.name, location = %location, "Empty path, trying next location");
                }
                Err(e) => {
                    warn!(
                        component = %component.name,
                        location = %location,
                        error = %e,
                        "Could not extract path"
                    );
                }
            }
        }

        Err(LocationResolutionError::NoUsableLocation {
            component: component.name.clone(),
        })
    }
}

/// Harvested paths, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestResult {
    /// Raw paths of `.mov`/`.mp4` files
    pub previews: Vec<String>,
    /// Raw paths of one frame per file sequence
    pub sequences: Vec<String>,
    /// Versions that contributed no files
    pub empty_versions: Vec<String>,
    /// Additional entries that are not a preview or a foldered sequence frame
    pub skipped_additional: Vec<String>,
}

impl HarvestResult {
    /// Classify and append a raw path; unsupported paths are dropped
    ///
    /// A sequence frame without a parent folder counts as unsupported.
    pub fn push(&mut self, raw: &str) -> FileKind {
        match path::classify(raw) {
            FileKind::Preview => {
                self.previews.push(raw.to_string());
                FileKind::Preview
            }
            FileKind::Sequence if sequence_folder(raw).is_some() => {
                self.sequences.push(raw.to_string());
                FileKind::Sequence
            }
            _ => FileKind::Unsupported,
        }
    }

    /// Merge free-form paths, one per line
    pub fn add_additional_files(&mut self, text: &str) {
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if self.push(line) == FileKind::Unsupported {
                warn!(path = %line, "Skipping unsupported additional file");
                self.skipped_additional.push(line.to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.previews.is_empty() && self.sequences.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.previews.len() + self.sequences.len()
    }
}

/// Collects component paths across a review session
pub struct ComponentHarvester {
    review: Arc<dyn ReviewSystem>,
    selector: LocationSelector,
}

impl ComponentHarvester {
    pub fn new(review: Arc<dyn ReviewSystem>, selector: LocationSelector) -> Self {
        Self { review, selector }
    }

    /// Harvest every version in the session, then merge `additional_files`
    ///
    /// # Errors
    /// Only when the review system cannot be queried.
    pub async fn harvest(
        &self,
        session: &ReviewSession,
        additional_files: &str,
    ) -> revdist_common::Result<HarvestResult> {
        let mut result = HarvestResult::default();

        for object in &session.objects {
            let version = &object.asset_version;
            let ident = version.ident();
            let components = self.review.components_of_version(&version.id).await?;
            let mut version_had_files = false;

            for component in &components {
                match self.selector.resolve_component_path(component) {
                    Ok(resolved) => match result.push(&resolved.path) {
                        FileKind::Unsupported => {
                            debug!(
                                version = %ident,
                                component = %component.name,
                                path = %resolved.path,
                                "Ignoring unsupported file"
                            );
                        }
                        kind => {
                            debug!(
                                version = %ident,
                                component = %component.name,
                                location = %resolved.location,
                                kind = ?kind,
                                "Harvested component"
                            );
                            version_had_files = true;
                        }
                    },
                    Err(e) => {
                        debug!(version = %ident, component = %component.name, reason = %e, "No files found");
                    }
                }
            }

            if !version_had_files {
                warn!(version = %ident, "No files found");
                result.empty_versions.push(ident);
            }
        }

        result.add_additional_files(additional_files);

        info!(
            previews = result.previews.len(),
            sequences = result.sequences.len(),
            empty_versions = result.empty_versions.len(),
            "Harvest complete"
        );
        Ok(result)
    }
}
