//! Overlay seeding from preselected scanner findings.
//!
//! # Responsibility
//! - Build the first overlay for an input file from preselected records.
//! - Write it durably before the pipeline reads it back.
//!
//! # Invariants
//! - Seeded records carry no external provenance.
//! - Every seeded id is fresh: it equals no external id and no other seeded id.
//! - Mapping order of surviving ids matches the scanner mapping.
//! - The resolved-external list of a fresh overlay is empty.

use log::{info, warn};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::model::attribution::{
    Attributions, ExternalAttributionId, ManualAttributionId, ResourcesToAttributions,
};
use crate::repo::project_files::{FileResult, ProjectFileStore};
use crate::repo::raw::{RawOverlayFile, RawOverlayMetadata, RawPackageInfo};
use crate::service::sanitize::compact_mapping;

const MAX_ID_ATTEMPTS: usize = 8;

/// Source of ids in the manual namespace.
pub trait IdGenerator {
    fn next_manual_id(&mut self) -> ManualAttributionId;
}

/// Random v4 UUID ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_manual_id(&mut self) -> ManualAttributionId {
        ManualAttributionId::new(Uuid::new_v4().to_string())
    }
}

/// Overlay metadata inputs for one seeding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRequest<'a> {
    pub project_id: &'a str,
    pub input_file_checksum: &'a str,
    /// Epoch milliseconds as a string.
    pub file_creation_date: String,
}

/// Builds overlay content from the preselected part of the external set.
pub fn build_seeded_overlay(
    external: &Attributions<ExternalAttributionId>,
    mapping: &ResourcesToAttributions<ExternalAttributionId>,
    request: &SeedRequest<'_>,
    ids: &mut dyn IdGenerator,
) -> RawOverlayFile {
    let mut translation: BTreeMap<ExternalAttributionId, ManualAttributionId> = BTreeMap::new();
    let mut manual_attributions = BTreeMap::new();

    for (external_id, info) in external.iter().filter(|(_, info)| info.pre_selected) {
        let manual_id = fresh_manual_id(ids, external, &manual_attributions);
        let record = RawPackageInfo::from(&info.clone().into_manual());
        manual_attributions.insert(manual_id.clone(), record);
        translation.insert(external_id.clone(), manual_id);
    }

    let resources_to_attributions = compact_mapping(mapping, &translation)
        .mapping
        .into_iter()
        .map(|(resource_id, external_ids)| {
            let manual_ids = external_ids
                .iter()
                .filter_map(|id| translation.get(id).cloned())
                .collect();
            (resource_id, manual_ids)
        })
        .collect();

    RawOverlayFile {
        metadata: RawOverlayMetadata {
            project_id: request.project_id.to_string(),
            file_creation_date: request.file_creation_date.clone(),
            input_file_md5_checksum: Some(request.input_file_checksum.to_string()),
        },
        manual_attributions,
        resources_to_attributions,
        resolved_external_attributions: Vec::new(),
    }
}

/// Builds the seeded overlay and writes it to `overlay_path`.
///
/// Returns the written content once the store reports it durable.
pub fn seed_overlay_file<S: ProjectFileStore + ?Sized>(
    store: &S,
    overlay_path: &Path,
    external: &Attributions<ExternalAttributionId>,
    mapping: &ResourcesToAttributions<ExternalAttributionId>,
    request: &SeedRequest<'_>,
    ids: &mut dyn IdGenerator,
) -> FileResult<RawOverlayFile> {
    let overlay = build_seeded_overlay(external, mapping, request, ids);
    store.write_overlay(overlay_path, &overlay)?;
    info!(
        "event=overlay_seeded module=seed status=ok project_id={} attributions={} resources={} path={}",
        request.project_id,
        overlay.manual_attributions.len(),
        overlay.resources_to_attributions.len(),
        overlay_path.display()
    );
    Ok(overlay)
}

fn fresh_manual_id(
    ids: &mut dyn IdGenerator,
    external: &Attributions<ExternalAttributionId>,
    seeded: &BTreeMap<ManualAttributionId, RawPackageInfo>,
) -> ManualAttributionId {
    let is_taken = |id: &ManualAttributionId| {
        seeded.contains_key(id) || external.contains_key(&ExternalAttributionId::new(id.as_str()))
    };

    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = ids.next_manual_id();
        if !is_taken(&candidate) {
            return candidate;
        }
    }

    warn!(
        "event=id_generator_exhausted module=seed status=warn attempts={} fallback=uuid_v4",
        MAX_ID_ATTEMPTS
    );
    loop {
        let candidate = UuidIdGenerator.next_manual_id();
        if !is_taken(&candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{build_seeded_overlay, IdGenerator, SeedRequest};
    use crate::model::attribution::{
        ExternalAttributionId, ManualAttributionId, PackageInfo, Source,
    };
    use std::collections::BTreeMap;

    struct FixedIds(Vec<&'static str>);

    impl IdGenerator for FixedIds {
        fn next_manual_id(&mut self) -> ManualAttributionId {
            ManualAttributionId::new(self.0.remove(0))
        }
    }

    fn request() -> SeedRequest<'static> {
        SeedRequest {
            project_id: "p1",
            input_file_checksum: "abc",
            file_creation_date: "1700000000000".to_string(),
        }
    }

    #[test]
    fn skips_candidate_ids_that_collide_with_external_ids() {
        let mut external = BTreeMap::new();
        external.insert(
            ExternalAttributionId::new("e1"),
            PackageInfo {
                pre_selected: true,
                source: Some(Source {
                    name: "SC".to_string(),
                    document_confidence: None,
                }),
                ..PackageInfo::default()
            },
        );
        let mut mapping = BTreeMap::new();
        mapping.insert("/a".to_string(), vec![ExternalAttributionId::new("e1")]);

        let mut ids = FixedIds(vec!["e1", "m1"]);
        let overlay = build_seeded_overlay(&external, &mapping, &request(), &mut ids);

        let seeded_id = ManualAttributionId::new("m1");
        assert_eq!(overlay.manual_attributions.len(), 1);
        assert!(overlay.manual_attributions[&seeded_id].source.is_none());
        assert_eq!(overlay.resources_to_attributions["/a"], vec![seeded_id]);
        assert_eq!(overlay.metadata.input_file_md5_checksum.as_deref(), Some("abc"));
        assert!(overlay.resolved_external_attributions.is_empty());
    }

    #[test]
    fn nothing_preselected_yields_empty_overlay() {
        let mut external = BTreeMap::new();
        external.insert(ExternalAttributionId::new("e1"), PackageInfo::default());
        let mut mapping = BTreeMap::new();
        mapping.insert("/a".to_string(), vec![ExternalAttributionId::new("e1")]);

        let mut ids = FixedIds(vec![]);
        let overlay = build_seeded_overlay(&external, &mapping, &request(), &mut ids);
        assert!(overlay.manual_attributions.is_empty());
        assert!(overlay.resources_to_attributions.is_empty());
    }
}
