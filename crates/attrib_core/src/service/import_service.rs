//! Project import orchestration.
//!
//! # Responsibility
//! - Run the load pipeline: parse input, seed or locate the overlay, parse it,
//!   normalize, sanitize, merge and deliver one snapshot.
//! - Replace the project context only after a snapshot was delivered.
//!
//! # Invariants
//! - A failed load leaves `ProjectContext` untouched.
//! - The overlay is seeded at most once per input file and only when absent.
//! - A seeded overlay is durable before it is read back.
//! - `load_project` takes `&mut self`, so loads never overlap.

use chrono::Utc;
use log::{debug, error, info};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

use crate::model::attribution::DEFAULT_ATTRIBUTION_CONFIDENCE;
use crate::model::project::{AttributionData, MergedSnapshot, ProjectContext, ProjectIdentity};
use crate::model::resource::ResourceTree;
use crate::repo::project_files::{
    overlay_path_for, FileError, InputFileContent, ProjectFileStore, DEFAULT_OVERLAY_SUFFIX,
};
use crate::service::normalize::{
    hydrate_license_texts, normalize_attributions, parse_external_attribution_sources,
    parse_frequent_licenses, parse_project_metadata, sanitize_base_urls_for_sources,
};
use crate::service::sanitize::{
    canonicalize_mapping_paths, sanitize_mapping, sanitize_resolved_external_ids,
    DroppedReference,
};
use crate::service::seed::{seed_overlay_file, IdGenerator, SeedRequest, UuidIdGenerator};

/// Import tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Appended to the input file stem to name the overlay file.
    pub overlay_suffix: String,
    /// Confidence for records without a usable value.
    pub default_confidence: u8,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            overlay_suffix: DEFAULT_OVERLAY_SUFFIX.to_string(),
            default_confidence: DEFAULT_ATTRIBUTION_CONFIDENCE,
        }
    }
}

/// Receiver of pipeline output; typically the editing UI.
pub trait EditingSurface {
    /// Discards any previously loaded project before new data arrives.
    fn reset_loaded_file(&mut self);
    /// Shows a load failure to the user.
    fn present_parse_failure(&mut self, message: &str);
    /// Diagnostic for a reference removed during sanitization.
    fn report_dropped_reference(&mut self, resource_id: Option<&str>, attribution_id: &str);
    fn deliver_snapshot(&mut self, snapshot: MergedSnapshot);
}

/// Pipeline position. `Idle` and `Ready` are the only resting stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Idle,
    ParsingInput,
    InputParseFailed,
    InputParsed,
    SeedingOverlay,
    SeedingFailed,
    ParsingOverlay,
    OverlayParseFailed,
    OverlayParsed,
    Merging,
    Ready,
}

impl ImportStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ParsingInput => "parsing_input",
            Self::InputParseFailed => "input_parse_failed",
            Self::InputParsed => "input_parsed",
            Self::SeedingOverlay => "seeding_overlay",
            Self::SeedingFailed => "seeding_failed",
            Self::ParsingOverlay => "parsing_overlay",
            Self::OverlayParseFailed => "overlay_parse_failed",
            Self::OverlayParsed => "overlay_parsed",
            Self::Merging => "merging",
            Self::Ready => "ready",
        }
    }
}

/// Load failure.
#[derive(Debug)]
pub enum ImportError {
    /// Input file unreadable or malformed; the user may pick another file.
    InputParse(FileError),
    /// Overlay could not be created next to the input file.
    SeedingWrite(FileError),
    /// Overlay exists but cannot be decoded.
    OverlayIntegrity(FileError),
}

impl ImportError {
    /// Only input faults can be fixed by retrying with another file.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(self, Self::InputParse(_))
    }

    /// Message presented on the editing surface.
    pub fn user_message(&self) -> String {
        match self {
            Self::InputParse(err) => format!("The input file could not be loaded. {err}"),
            Self::SeedingWrite(err) => format!(
                "The attribution file `{}` could not be created. {err}",
                err.path().display()
            ),
            Self::OverlayIntegrity(err) => format!(
                "The attribution file `{}` is corrupt and must be repaired before loading. {err}",
                err.path().display()
            ),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::InputParse(_) => "input_parse",
            Self::SeedingWrite(_) => "seeding_write",
            Self::OverlayIntegrity(_) => "overlay_integrity",
        }
    }
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InputParse(err) => write!(f, "input file rejected: {err}"),
            Self::SeedingWrite(err) => write!(f, "overlay seeding failed: {err}"),
            Self::OverlayIntegrity(err) => write!(f, "overlay integrity fault: {err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InputParse(err) | Self::SeedingWrite(err) | Self::OverlayIntegrity(err) => {
                Some(err)
            }
        }
    }
}

/// Import pipeline over a file store and a manual id source.
pub struct ImportService<S: ProjectFileStore, G: IdGenerator = UuidIdGenerator> {
    store: S,
    ids: G,
    config: ImportConfig,
    stage: ImportStage,
}

impl<S: ProjectFileStore> ImportService<S, UuidIdGenerator> {
    /// Creates a service with random UUID ids and default config.
    pub fn new(store: S) -> Self {
        Self::with_parts(store, UuidIdGenerator, ImportConfig::default())
    }
}

impl<S: ProjectFileStore, G: IdGenerator> ImportService<S, G> {
    pub fn with_parts(store: S, ids: G, config: ImportConfig) -> Self {
        Self {
            store,
            ids,
            config,
            stage: ImportStage::Idle,
        }
    }

    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    /// Loads `input_path` and delivers its merged snapshot to `surface`.
    ///
    /// # Contract
    /// - Calls `surface.reset_loaded_file()` first.
    /// - On failure, presents `ImportError::user_message()` on the surface,
    ///   returns to `Idle` and leaves `context` unchanged.
    /// - On success, delivers exactly one snapshot, then replaces `context`.
    pub fn load_project(
        &mut self,
        input_path: &Path,
        context: &mut ProjectContext,
        surface: &mut dyn EditingSurface,
    ) -> Result<(), ImportError> {
        surface.reset_loaded_file();
        info!(
            "event=import_start module=import status=ok path={}",
            input_path.display()
        );

        match self.run_pipeline(input_path, surface) {
            Ok((snapshot, identity)) => {
                surface.deliver_snapshot(snapshot);
                info!(
                    "event=snapshot_delivered module=import status=ok project_id={}",
                    identity.project_id
                );
                context.replace(identity);
                self.enter(ImportStage::Ready);
                info!("event=import_finished module=import status=ok");
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=import_failed module=import status=error kind={} stage={} recoverable={} error={}",
                    err.kind(),
                    self.stage.as_str(),
                    err.is_user_recoverable(),
                    err
                );
                surface.present_parse_failure(&err.user_message());
                self.enter(ImportStage::Idle);
                Err(err)
            }
        }
    }

    fn run_pipeline(
        &mut self,
        input_path: &Path,
        surface: &mut dyn EditingSurface,
    ) -> Result<(MergedSnapshot, ProjectIdentity), ImportError> {
        self.enter(ImportStage::ParsingInput);
        let InputFileContent {
            file: input,
            checksum,
        } = match self.store.read_input(input_path) {
            Ok(content) => content,
            Err(err) => {
                self.enter(ImportStage::InputParseFailed);
                return Err(ImportError::InputParse(err));
            }
        };
        self.enter(ImportStage::InputParsed);
        info!(
            "event=input_parsed module=import status=ok project_id={} external_attributions={}",
            input.metadata.project_id,
            input.external_attributions.len()
        );

        let external =
            normalize_attributions(input.external_attributions, self.config.default_confidence);
        let resources = ResourceTree::new(
            input
                .resources
                .into_iter()
                .map(|(name, node)| (name, node.into()))
                .collect(),
        );
        let external_mapping =
            canonicalize_mapping_paths(&resources, &input.resources_to_attributions);

        let overlay_path = overlay_path_for(input_path, &self.config.overlay_suffix);
        if !self.store.overlay_exists(&overlay_path) {
            self.enter(ImportStage::SeedingOverlay);
            let request = SeedRequest {
                project_id: &input.metadata.project_id,
                input_file_checksum: &checksum,
                file_creation_date: Utc::now().timestamp_millis().to_string(),
            };
            if let Err(err) = seed_overlay_file(
                &self.store,
                &overlay_path,
                &external.attributions,
                &external_mapping,
                &request,
                &mut self.ids,
            ) {
                self.enter(ImportStage::SeedingFailed);
                return Err(ImportError::SeedingWrite(err));
            }
        }

        self.enter(ImportStage::ParsingOverlay);
        let overlay = match self.store.read_overlay(&overlay_path) {
            Ok(overlay) => overlay,
            Err(err) => {
                self.enter(ImportStage::OverlayParseFailed);
                return Err(ImportError::OverlayIntegrity(err));
            }
        };
        self.enter(ImportStage::OverlayParsed);
        info!(
            "event=overlay_parsed module=import status=ok manual_attributions={} path={}",
            overlay.manual_attributions.len(),
            overlay_path.display()
        );

        self.enter(ImportStage::Merging);
        let mut manual =
            normalize_attributions(overlay.manual_attributions, self.config.default_confidence);
        let manual_mapping = sanitize_mapping(
            &overlay.resources_to_attributions,
            &manual.attributions,
            "manual",
        );
        forward_dropped(surface, &manual_mapping.dropped);

        let (resolved_external_attributions, dropped_resolved) = sanitize_resolved_external_ids(
            &overlay.resolved_external_attributions,
            &external.attributions,
        );
        forward_dropped(surface, &dropped_resolved);

        let external_mapping =
            sanitize_mapping(&external_mapping, &external.attributions, "external");
        forward_dropped(surface, &external_mapping.dropped);

        let frequent_licenses = parse_frequent_licenses(input.frequent_licenses);
        let mut external_attributions = external.attributions;
        let hydrated = hydrate_license_texts(&mut manual.attributions, &frequent_licenses)
            + hydrate_license_texts(&mut external_attributions, &frequent_licenses);
        debug!(
            "event=license_texts_hydrated module=import status=ok records={}",
            hydrated
        );

        let metadata = parse_project_metadata(input.metadata);
        let identity = ProjectIdentity {
            project_id: metadata.project_id.clone(),
            project_title: metadata.project_title.clone(),
            input_file_checksum: checksum,
            contains_critical_external_attributions: external.contains_critical,
        };
        let snapshot = MergedSnapshot {
            metadata,
            resources,
            manual_attributions: AttributionData {
                attributions: manual.attributions,
                resources_to_attributions: manual_mapping.mapping,
            },
            external_attributions: AttributionData {
                attributions: external_attributions,
                resources_to_attributions: external_mapping.mapping,
            },
            frequent_licenses,
            resolved_external_attributions,
            attribution_breakpoints: into_set(input.attribution_breakpoints),
            files_with_children: into_set(input.files_with_children),
            base_urls_for_sources: sanitize_base_urls_for_sources(input.base_urls_for_sources),
            external_attribution_sources: parse_external_attribution_sources(
                input.external_attribution_sources,
            ),
        };

        Ok((snapshot, identity))
    }

    fn enter(&mut self, stage: ImportStage) {
        debug!(
            "event=import_stage module=import status=ok from={} to={}",
            self.stage.as_str(),
            stage.as_str()
        );
        self.stage = stage;
    }
}

fn forward_dropped<Id: Display>(surface: &mut dyn EditingSurface, dropped: &[DroppedReference<Id>]) {
    for reference in dropped {
        surface.report_dropped_reference(
            reference.resource_id.as_deref(),
            &reference.attribution_id.to_string(),
        );
    }
}

fn into_set(values: Option<Vec<String>>) -> BTreeSet<String> {
    values.unwrap_or_default().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::{ImportError, ImportStage};
    use crate::repo::project_files::FileError;
    use std::path::PathBuf;

    fn invalid(path: &str) -> FileError {
        FileError::InvalidContent {
            path: PathBuf::from(path),
            message: "truncated".to_string(),
        }
    }

    #[test]
    fn only_input_faults_are_user_recoverable() {
        assert!(ImportError::InputParse(invalid("/p.json")).is_user_recoverable());
        assert!(!ImportError::SeedingWrite(invalid("/p_attributions.json")).is_user_recoverable());
        assert!(
            !ImportError::OverlayIntegrity(invalid("/p_attributions.json")).is_user_recoverable()
        );
    }

    #[test]
    fn overlay_fault_message_names_the_overlay_path() {
        let message =
            ImportError::OverlayIntegrity(invalid("/data/p_attributions.json")).user_message();
        assert!(message.contains("/data/p_attributions.json"));
        assert!(message.contains("truncated"));
    }

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(ImportStage::Idle.as_str(), "idle");
        assert_eq!(ImportStage::OverlayParseFailed.as_str(), "overlay_parse_failed");
    }
}
