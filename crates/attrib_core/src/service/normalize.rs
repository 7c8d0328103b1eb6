//! Raw record normalization.
//!
//! # Responsibility
//! - Convert wire-shaped records from either file into canonical `PackageInfo`.
//! - Report whether any normalized record is critical.
//! - Convert the auxiliary input tables (licenses, base URLs, sources).
//!
//! # Invariants
//! - Normalization is pure; it never touches the filesystem or the log.
//! - License text hydration is not done here; see `hydrate_license_texts`.

use log::warn;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::attribution::{Attributions, PackageInfo, Source};
use crate::model::project::{
    BaseUrlsForSources, ExternalAttributionSource, ExternalAttributionSources, FrequentLicenses,
    LicenseName, ProjectMetadata,
};
use crate::model::resource::as_directory_id;
use crate::repo::raw::{
    criticality_from_wire, RawExternalAttributionSource, RawFrequentLicense, RawPackageInfo,
    RawProjectMetadata, FOLLOW_UP_WIRE_VALUE,
};

/// Normalized attribution set of one namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAttributions<Id: Ord> {
    pub attributions: Attributions<Id>,
    /// True when at least one record is critical.
    pub contains_critical: bool,
}

/// Normalizes every raw record and captures the critical flag.
pub fn normalize_attributions<Id: Ord>(
    raw: BTreeMap<Id, RawPackageInfo>,
    default_confidence: u8,
) -> NormalizedAttributions<Id> {
    let mut contains_critical = false;
    let attributions = raw
        .into_iter()
        .map(|(id, record)| {
            let info = normalize_package_info(record, default_confidence);
            contains_critical |= info.is_critical();
            (id, info)
        })
        .collect();

    NormalizedAttributions {
        attributions,
        contains_critical,
    }
}

/// Normalizes one raw record.
pub fn normalize_package_info(raw: RawPackageInfo, default_confidence: u8) -> PackageInfo {
    PackageInfo {
        attribution_confidence: normalize_confidence(
            raw.attribution_confidence.as_ref(),
            default_confidence,
        ),
        pre_selected: raw.pre_selected.unwrap_or(false),
        first_party: raw.first_party.unwrap_or(false),
        follow_up: raw.follow_up.as_ref().and_then(Value::as_str) == Some(FOLLOW_UP_WIRE_VALUE),
        exclude_from_notice: raw.exclude_from_notice.unwrap_or(false),
        needs_review: raw.needs_review.unwrap_or(false),
        criticality: criticality_from_wire(raw.criticality.as_ref()),
        source: raw.source.map(|source| Source {
            name: source.name,
            document_confidence: source.document_confidence,
        }),
        origin_ids: raw.origin_ids.unwrap_or_default(),
        package_name: raw.package_name,
        package_version: raw.package_version,
        package_namespace: raw.package_namespace,
        package_type: raw.package_type,
        package_purl_appendix: raw.package_purl_appendix,
        url: raw.url,
        copyright: raw.copyright,
        license_name: raw.license_name,
        license_text: raw.license_text,
        comment: raw.comment,
    }
}

/// Numeric confidence in `0..=100`, rounded; anything else yields `default`.
pub fn normalize_confidence(value: Option<&Value>, default: u8) -> u8 {
    match value.and_then(Value::as_f64) {
        Some(number) if number.is_finite() && (0.0..=100.0).contains(&number) => {
            number.round() as u8
        }
        _ => default,
    }
}

/// Fills absent license texts from the frequent licenses table.
///
/// Returns the number of records that received a text. Records whose license
/// name is unknown to the table keep an absent text.
pub fn hydrate_license_texts<Id: Ord>(
    attributions: &mut Attributions<Id>,
    frequent_licenses: &FrequentLicenses,
) -> usize {
    let mut hydrated = 0;
    for info in attributions.values_mut() {
        if info.license_text.is_some() {
            continue;
        }
        let text = info
            .license_name
            .as_deref()
            .and_then(|name| frequent_licenses.text_for(name.trim()));
        if let Some(text) = text {
            info.license_text = Some(text.to_string());
            hydrated += 1;
        }
    }
    hydrated
}

/// Converts the raw license list, keeping its order for display.
pub fn parse_frequent_licenses(raw: Option<Vec<RawFrequentLicense>>) -> FrequentLicenses {
    let mut licenses = FrequentLicenses::default();
    for license in raw.unwrap_or_default() {
        licenses
            .texts
            .insert(license.short_name.clone(), license.default_text);
        licenses.name_order.push(LicenseName {
            short_name: license.short_name,
            full_name: license.full_name,
        });
    }
    licenses
}

/// Canonicalizes every base URL key to a directory id.
///
/// When two keys canonicalize to the same id, the later key in map order wins.
pub fn sanitize_base_urls_for_sources(
    raw: Option<BTreeMap<String, Option<String>>>,
) -> BaseUrlsForSources {
    let mut sanitized = BaseUrlsForSources::new();
    for (path, url) in raw.unwrap_or_default() {
        let directory_id = as_directory_id(&path);
        if sanitized.insert(directory_id.clone(), url).is_some() {
            warn!(
                "event=base_url_key_collision module=normalize status=warn key={path:?} directory={directory_id:?}"
            );
        }
    }
    sanitized
}

pub fn parse_external_attribution_sources(
    raw: Option<BTreeMap<String, RawExternalAttributionSource>>,
) -> ExternalAttributionSources {
    raw.unwrap_or_default()
        .into_iter()
        .map(|(key, source)| {
            (
                key,
                ExternalAttributionSource {
                    name: source.name,
                    priority: source.priority,
                },
            )
        })
        .collect()
}

pub fn parse_project_metadata(raw: RawProjectMetadata) -> ProjectMetadata {
    ProjectMetadata {
        project_id: raw.project_id,
        project_title: raw.project_title,
        file_creation_date: raw.file_creation_date,
        extra: raw.extra,
    }
}
