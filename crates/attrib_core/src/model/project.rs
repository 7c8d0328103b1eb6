//! Project-level model: metadata, merged snapshot and project identity.
//!
//! # Responsibility
//! - Define the single snapshot delivered to the editing surface per load.
//! - Define the process-wide "currently open project" context.
//!
//! # Invariants
//! - A `MergedSnapshot` is never patched; the next load supersedes it.
//! - Every id in a snapshot mapping is a key of the same namespace's set.
//! - `ProjectContext` starts as `NoProject` and is replaced wholesale.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::attribution::{
    Attributions, ExternalAttributionId, ManualAttributionId, ResourcesToAttributions,
};
use crate::model::resource::{ResourceId, ResourceTree};

/// Metadata block of the input file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectMetadata {
    pub project_id: String,
    pub project_title: Option<String>,
    pub file_creation_date: Option<String>,
    /// Unknown metadata keys, preserved verbatim.
    pub extra: BTreeMap<String, Value>,
}

/// Display entry of the frequent licenses table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseName {
    pub short_name: String,
    pub full_name: String,
}

/// Canonical texts of licenses that the input elides per record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequentLicenses {
    /// Input order.
    pub name_order: Vec<LicenseName>,
    /// Short name to license text.
    pub texts: BTreeMap<String, String>,
}

impl FrequentLicenses {
    /// Resolves a license text by short name, then by full name.
    pub fn text_for(&self, license_name: &str) -> Option<&str> {
        if let Some(text) = self.texts.get(license_name) {
            return Some(text.as_str());
        }
        self.name_order
            .iter()
            .find(|name| name.full_name == license_name)
            .and_then(|name| self.texts.get(&name.short_name))
            .map(String::as_str)
    }
}

/// Display information for one external attribution source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAttributionSource {
    pub name: String,
    pub priority: i64,
}

pub type ExternalAttributionSources = BTreeMap<String, ExternalAttributionSource>;

/// Directory id to base URL; `None` disables links below that directory.
pub type BaseUrlsForSources = BTreeMap<ResourceId, Option<String>>;

/// Attribution set plus its sanitized resource mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionData<Id: Ord> {
    pub attributions: Attributions<Id>,
    pub resources_to_attributions: ResourcesToAttributions<Id>,
}

impl<Id: Ord> Default for AttributionData<Id> {
    fn default() -> Self {
        Self {
            attributions: BTreeMap::new(),
            resources_to_attributions: BTreeMap::new(),
        }
    }
}

/// Project view delivered to the editing surface after a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSnapshot {
    pub metadata: ProjectMetadata,
    pub resources: ResourceTree,
    pub manual_attributions: AttributionData<ManualAttributionId>,
    pub external_attributions: AttributionData<ExternalAttributionId>,
    pub frequent_licenses: FrequentLicenses,
    pub resolved_external_attributions: BTreeSet<ExternalAttributionId>,
    pub attribution_breakpoints: BTreeSet<ResourceId>,
    pub files_with_children: BTreeSet<ResourceId>,
    pub base_urls_for_sources: BaseUrlsForSources,
    pub external_attribution_sources: ExternalAttributionSources,
}

/// Identity of the currently open project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentity {
    pub project_id: String,
    pub project_title: Option<String>,
    /// MD5 hex digest of the input file bytes.
    pub input_file_checksum: String,
    pub contains_critical_external_attributions: bool,
}

/// Process-wide "what project is open" state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProjectContext {
    #[default]
    NoProject,
    Loaded(ProjectIdentity),
}

impl ProjectContext {
    /// Replaces the context wholesale with a newly loaded project.
    pub fn replace(&mut self, identity: ProjectIdentity) {
        *self = Self::Loaded(identity);
    }

    /// Returns the loaded project identity, if any.
    pub fn identity(&self) -> Option<&ProjectIdentity> {
        match self {
            Self::NoProject => None,
            Self::Loaded(identity) => Some(identity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrequentLicenses, LicenseName, ProjectContext, ProjectIdentity};

    #[test]
    fn frequent_license_lookup_falls_back_to_full_name() {
        let mut licenses = FrequentLicenses::default();
        licenses.name_order.push(LicenseName {
            short_name: "MIT".to_string(),
            full_name: "MIT License".to_string(),
        });
        licenses
            .texts
            .insert("MIT".to_string(), "Permission is hereby granted".to_string());

        assert_eq!(licenses.text_for("MIT"), Some("Permission is hereby granted"));
        assert_eq!(
            licenses.text_for("MIT License"),
            Some("Permission is hereby granted")
        );
        assert_eq!(licenses.text_for("GPL-2.0"), None);
    }

    #[test]
    fn context_starts_empty_and_is_replaced_wholesale() {
        let mut context = ProjectContext::default();
        assert!(context.identity().is_none());

        context.replace(ProjectIdentity {
            project_id: "p1".to_string(),
            project_title: Some("First".to_string()),
            input_file_checksum: "abc".to_string(),
            contains_critical_external_attributions: true,
        });
        context.replace(ProjectIdentity {
            project_id: "p2".to_string(),
            project_title: None,
            input_file_checksum: "def".to_string(),
            contains_critical_external_attributions: false,
        });

        let identity = context.identity().expect("project should be loaded");
        assert_eq!(identity.project_id, "p2");
        assert_eq!(identity.project_title, None);
        assert!(!identity.contains_critical_external_attributions);
    }
}
