//! Attribution import core.
//!
//! Loads a scanner input file, reconciles it with the user-owned overlay file
//! next to it and hands one consistent project snapshot to the editing surface.

pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attribution::{
    Attributions, Criticality, ExternalAttributionId, ManualAttributionId, PackageInfo,
    ResourcesToAttributions, Source, DEFAULT_ATTRIBUTION_CONFIDENCE,
};
pub use model::project::{
    AttributionData, FrequentLicenses, MergedSnapshot, ProjectContext, ProjectIdentity,
    ProjectMetadata,
};
pub use model::resource::{ResourceId, ResourceNode, ResourceTree};
pub use repo::project_files::{
    overlay_path_for, FileError, FsProjectFileStore, InputFileContent, ProjectFileStore,
    DEFAULT_OVERLAY_SUFFIX,
};
pub use service::import_service::{
    EditingSurface, ImportConfig, ImportError, ImportService, ImportStage,
};
pub use service::seed::{IdGenerator, UuidIdGenerator};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
