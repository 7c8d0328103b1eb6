//! Wire shapes of the input and overlay files.
//!
//! These types mirror the JSON documents exactly and stay loosely typed where
//! scanners disagree on value shapes. They must not travel past the
//! normalizer; services convert them into `model` types immediately.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::attribution::{
    Criticality, ExternalAttributionId, ManualAttributionId, PackageInfo,
};
use crate::model::resource::ResourceNode;

/// Wire literal marking a record for follow-up.
pub const FOLLOW_UP_WIRE_VALUE: &str = "FOLLOW_UP";

/// Loosely-typed attribution record as stored in either file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPackageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_type: Option<String>,
    #[serde(
        default,
        rename = "packagePURLAppendix",
        skip_serializing_if = "Option::is_none"
    )]
    pub package_purl_appendix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Numeric in well-formed files; anything else falls back to the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution_confidence: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_selected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_party: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_from_notice: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_review: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criticality: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<RawSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_confidence: Option<f64>,
}

/// Resource tree node: nested objects are directories, `1` is a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawResourceNode {
    Directory(BTreeMap<String, RawResourceNode>),
    File(u8),
}

impl From<RawResourceNode> for ResourceNode {
    fn from(value: RawResourceNode) -> Self {
        match value {
            RawResourceNode::File(_) => ResourceNode::File,
            RawResourceNode::Directory(children) => ResourceNode::Directory(
                children
                    .into_iter()
                    .map(|(name, child)| (name, child.into()))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProjectMetadata {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_creation_date: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFrequentLicense {
    pub short_name: String,
    pub full_name: String,
    pub default_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExternalAttributionSource {
    pub name: String,
    pub priority: i64,
}

/// Scanner-produced input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInputFile {
    pub metadata: RawProjectMetadata,
    pub resources: BTreeMap<String, RawResourceNode>,
    pub external_attributions: BTreeMap<ExternalAttributionId, RawPackageInfo>,
    pub resources_to_attributions: BTreeMap<String, Vec<ExternalAttributionId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequent_licenses: Option<Vec<RawFrequentLicense>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution_breakpoints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_with_children: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_urls_for_sources: Option<BTreeMap<String, Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_attribution_sources: Option<BTreeMap<String, RawExternalAttributionSource>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOverlayMetadata {
    pub project_id: String,
    /// Epoch milliseconds, serialized as a string.
    pub file_creation_date: String,
    #[serde(
        default,
        rename = "inputFileMD5Checksum",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_file_md5_checksum: Option<String>,
}

/// User-owned overlay file holding manual attributions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOverlayFile {
    pub metadata: RawOverlayMetadata,
    pub manual_attributions: BTreeMap<ManualAttributionId, RawPackageInfo>,
    pub resources_to_attributions: BTreeMap<String, Vec<ManualAttributionId>>,
    #[serde(default)]
    pub resolved_external_attributions: Vec<ExternalAttributionId>,
}

impl From<&PackageInfo> for RawPackageInfo {
    fn from(info: &PackageInfo) -> Self {
        Self {
            package_name: info.package_name.clone(),
            package_version: info.package_version.clone(),
            package_namespace: info.package_namespace.clone(),
            package_type: info.package_type.clone(),
            package_purl_appendix: info.package_purl_appendix.clone(),
            url: info.url.clone(),
            copyright: info.copyright.clone(),
            license_name: info.license_name.clone(),
            license_text: info.license_text.clone(),
            comment: info.comment.clone(),
            attribution_confidence: Some(Value::from(info.attribution_confidence)),
            pre_selected: info.pre_selected.then_some(true),
            first_party: info.first_party.then_some(true),
            follow_up: info
                .follow_up
                .then(|| Value::from(FOLLOW_UP_WIRE_VALUE)),
            exclude_from_notice: info.exclude_from_notice.then_some(true),
            needs_review: info.needs_review.then_some(true),
            criticality: info.criticality.as_wire().map(Value::from),
            source: info.source.as_ref().map(|source| RawSource {
                name: source.name.clone(),
                document_confidence: source.document_confidence,
            }),
            origin_ids: (!info.origin_ids.is_empty()).then(|| info.origin_ids.clone()),
        }
    }
}

/// Reads the criticality wire value, tolerating non-string shapes.
pub fn criticality_from_wire(value: Option<&Value>) -> Criticality {
    Criticality::from_wire(value.and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use super::{RawInputFile, RawOverlayFile, RawPackageInfo, RawResourceNode};
    use crate::model::attribution::{Criticality, PackageInfo};
    use serde_json::json;

    #[test]
    fn input_file_decodes_nested_resources_and_optional_tables() {
        let value = json!({
            "metadata": { "projectId": "p1", "projectTitle": "Demo", "buildNumber": 7 },
            "resources": { "src": { "lib.rs": 1 }, "README.md": 1 },
            "externalAttributions": {
                "e1": { "packageName": "serde", "attributionConfidence": "high" }
            },
            "resourcesToAttributions": { "/src/lib.rs": ["e1"] }
        });

        let file: RawInputFile = serde_json::from_value(value).unwrap();
        assert_eq!(file.metadata.project_id, "p1");
        assert_eq!(file.metadata.extra["buildNumber"], 7);
        assert!(matches!(
            file.resources["src"],
            RawResourceNode::Directory(_)
        ));
        assert_eq!(file.resources["README.md"], RawResourceNode::File(1));
        assert!(file.frequent_licenses.is_none());
        assert!(file.attribution_breakpoints.is_none());
    }

    #[test]
    fn overlay_file_uses_md5_checksum_wire_name() {
        let value = json!({
            "metadata": {
                "projectId": "p1",
                "fileCreationDate": "1700000000000",
                "inputFileMD5Checksum": "abc"
            },
            "manualAttributions": {},
            "resourcesToAttributions": {}
        });

        let file: RawOverlayFile = serde_json::from_value(value).unwrap();
        assert_eq!(file.metadata.input_file_md5_checksum.as_deref(), Some("abc"));
        assert!(file.resolved_external_attributions.is_empty());
    }

    #[test]
    fn package_info_serializes_without_default_flags() {
        let info = PackageInfo {
            package_name: Some("react".to_string()),
            attribution_confidence: 20,
            pre_selected: true,
            follow_up: true,
            criticality: Criticality::Medium,
            ..PackageInfo::default()
        };

        let value = serde_json::to_value(RawPackageInfo::from(&info)).unwrap();
        assert_eq!(
            value,
            json!({
                "packageName": "react",
                "attributionConfidence": 20,
                "preSelected": true,
                "followUp": "FOLLOW_UP",
                "criticality": "medium"
            })
        );
    }
}
