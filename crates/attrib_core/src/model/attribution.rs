//! Attribution domain model.
//!
//! # Responsibility
//! - Define the strongly-typed attribution record shared by both namespaces.
//! - Keep external (scanner) and manual (user) identifiers apart at the type level.
//!
//! # Invariants
//! - An id from one namespace is never accepted where the other is expected.
//! - Optional text fields use `None` for absence; an empty string is a real value.
//! - `attribution_confidence` is always within `0..=100`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::model::resource::ResourceId;

/// Confidence assigned when a record carries no usable confidence value.
pub const DEFAULT_ATTRIBUTION_CONFIDENCE: u8 = 80;

macro_rules! attribution_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier text.
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

attribution_id!(
    /// Identifier assigned by the scanning tool; lives in the input file.
    ExternalAttributionId
);

attribution_id!(
    /// Identifier assigned by this engine; lives in the overlay file.
    ManualAttributionId
);

/// Attribution records keyed by id of one namespace.
pub type Attributions<Id> = BTreeMap<Id, PackageInfo>;

/// Resource to attribution mapping; sequence order is display order.
pub type ResourcesToAttributions<Id> = BTreeMap<ResourceId, Vec<Id>>;

/// Review urgency signalled by the scanner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Criticality {
    #[default]
    None,
    Medium,
    High,
}

impl Criticality {
    /// Parses the wire value; anything unrecognized is `None`.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("high") => Self::High,
            Some("medium") => Self::Medium,
            _ => Self::None,
        }
    }

    /// Wire value, or `None` when the record is not critical.
    pub fn as_wire(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Medium => Some("medium"),
            Self::High => Some("high"),
        }
    }

    /// Whether the record needs mandatory review before export.
    pub fn is_critical(self) -> bool {
        self != Self::None
    }
}

/// Provenance of an external finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// Source key, e.g. `SC` for a scancode run.
    pub name: String,
    pub document_confidence: Option<f64>,
}

/// Canonical attribution record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageInfo {
    pub package_name: Option<String>,
    pub package_version: Option<String>,
    pub package_namespace: Option<String>,
    pub package_type: Option<String>,
    pub package_purl_appendix: Option<String>,
    pub url: Option<String>,
    pub copyright: Option<String>,
    pub license_name: Option<String>,
    pub license_text: Option<String>,
    pub comment: Option<String>,
    /// Always within `0..=100`.
    pub attribution_confidence: u8,
    /// Scanner recommends accepting this finding without review.
    pub pre_selected: bool,
    pub first_party: bool,
    pub follow_up: bool,
    pub exclude_from_notice: bool,
    pub needs_review: bool,
    pub criticality: Criticality,
    /// Absent once the record is manually owned.
    pub source: Option<Source>,
    pub origin_ids: Vec<String>,
}

impl PackageInfo {
    /// Returns whether this record requires review before export.
    pub fn is_critical(&self) -> bool {
        self.criticality.is_critical()
    }

    /// Drops external provenance, turning the record into a user-owned one.
    pub fn into_manual(mut self) -> Self {
        self.source = None;
        self
    }
}
