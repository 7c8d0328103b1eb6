//! Reference sanitization for resource/attribution mappings.
//!
//! # Responsibility
//! - Drop mapping entries that point at attribution ids missing from their set.
//! - Canonicalize resource paths of the scanner mapping.
//!
//! # Invariants
//! - Every id left in a sanitized mapping is a key of the reference set.
//! - No sanitized mapping holds an empty sequence.
//! - Surviving ids keep their relative order.
//! - A dangling id never fails a load; it is logged once and dropped.

use log::warn;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use crate::model::attribution::{Attributions, ExternalAttributionId, ResourcesToAttributions};
use crate::model::resource::{collapse_repeated_slashes, ResourceId, ResourceTree};

/// Set of ids a mapping is allowed to reference.
pub trait ReferenceSet<Id> {
    fn contains_id(&self, id: &Id) -> bool;
}

impl<Id: Ord, V> ReferenceSet<Id> for BTreeMap<Id, V> {
    fn contains_id(&self, id: &Id) -> bool {
        self.contains_key(id)
    }
}

impl<Id: Ord> ReferenceSet<Id> for BTreeSet<Id> {
    fn contains_id(&self, id: &Id) -> bool {
        self.contains(id)
    }
}

/// One id removed because its reference set lacks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedReference<Id> {
    /// `None` for flat id lists that are not keyed by resource.
    pub resource_id: Option<ResourceId>,
    pub attribution_id: Id,
}

/// Mapping after filtering, with the ids that did not survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compacted<Id: Ord> {
    pub mapping: ResourcesToAttributions<Id>,
    pub dropped: Vec<DroppedReference<Id>>,
}

/// Splits `ids` into (kept, dropped) by membership, preserving order.
pub fn retain_known_ids<'a, Id, R>(
    ids: impl IntoIterator<Item = &'a Id>,
    reference: &R,
) -> (Vec<Id>, Vec<Id>)
where
    Id: Clone + 'a,
    R: ReferenceSet<Id> + ?Sized,
{
    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for id in ids {
        if reference.contains_id(id) {
            kept.push(id.clone());
        } else {
            dropped.push(id.clone());
        }
    }
    (kept, dropped)
}

/// Filters every sequence by membership and drops emptied resources.
///
/// Pure; callers decide whether dropped ids are defects worth logging.
pub fn compact_mapping<Id, R>(mapping: &ResourcesToAttributions<Id>, reference: &R) -> Compacted<Id>
where
    Id: Ord + Clone,
    R: ReferenceSet<Id> + ?Sized,
{
    let mut compacted = BTreeMap::new();
    let mut dropped = Vec::new();
    for (resource_id, ids) in mapping {
        let (kept, removed) = retain_known_ids(ids, reference);
        dropped.extend(removed.into_iter().map(|attribution_id| DroppedReference {
            resource_id: Some(resource_id.clone()),
            attribution_id,
        }));
        if !kept.is_empty() {
            compacted.insert(resource_id.clone(), kept);
        }
    }

    Compacted {
        mapping: compacted,
        dropped,
    }
}

/// Removes dangling references from `mapping` and logs each one.
///
/// `namespace` only labels the log events.
pub fn sanitize_mapping<Id, V>(
    mapping: &ResourcesToAttributions<Id>,
    attributions: &BTreeMap<Id, V>,
    namespace: &str,
) -> Compacted<Id>
where
    Id: Ord + Clone + Display,
{
    let compacted = compact_mapping(mapping, attributions);
    for dropped in &compacted.dropped {
        warn!(
            "event=dropped_reference module=sanitize status=warn namespace={} resource={} attribution={}",
            namespace,
            dropped.resource_id.as_deref().unwrap_or("-"),
            dropped.attribution_id
        );
    }
    compacted
}

/// Keeps only resolved ids that still exist in the external set.
pub fn sanitize_resolved_external_ids(
    resolved: &[ExternalAttributionId],
    external: &Attributions<ExternalAttributionId>,
) -> (
    BTreeSet<ExternalAttributionId>,
    Vec<DroppedReference<ExternalAttributionId>>,
) {
    let (kept, removed) = retain_known_ids(resolved, external);
    let dropped: Vec<_> = removed
        .into_iter()
        .map(|attribution_id| DroppedReference {
            resource_id: None,
            attribution_id,
        })
        .collect();
    for reference in &dropped {
        warn!(
            "event=dropped_reference module=sanitize status=warn namespace=resolved resource=- attribution={}",
            reference.attribution_id
        );
    }
    (kept.into_iter().collect(), dropped)
}

/// Canonicalizes mapping keys against the resource tree.
///
/// Repeated slashes collapse, a missing leading slash is added, and a key naming
/// a directory gains its trailing slash. Keys that collide after
/// canonicalization are merged in key order without duplicate ids.
pub fn canonicalize_mapping_paths<Id>(
    resources: &ResourceTree,
    mapping: &ResourcesToAttributions<Id>,
) -> ResourcesToAttributions<Id>
where
    Id: Ord + Clone,
{
    let mut canonical: ResourcesToAttributions<Id> = BTreeMap::new();
    for (path, ids) in mapping {
        let mut key = collapse_repeated_slashes(&format!("/{path}"));
        if !key.ends_with('/') && resources.is_directory(&key) {
            key.push('/');
        }

        let entry = canonical.entry(key).or_default();
        for id in ids {
            if !entry.contains(id) {
                entry.push(id.clone());
            }
        }
    }
    canonical.retain(|_, ids| !ids.is_empty());
    canonical
}
