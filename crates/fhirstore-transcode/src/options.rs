//! Transcoder configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::scalar::ScalarKind;
use crate::splitter::MarkerKind;

/// How decimal and temporal literals are laid out in stored trees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralLayout {
    /// Store them as [`Value::Decimal`](crate::Value::Decimal) /
    /// [`Value::Temporal`](crate::Value::Temporal).
    #[default]
    Native,
    /// Store them as indexable sub-trees next to their verbatim text
    /// (`{__num, __strNum}` and `{__strDate}`).
    Sidecar,
}

/// Options controlling transcoding in both directions.
///
/// ```
/// use fhirstore_transcode::{LiteralLayout, TranscodeOptions};
///
/// let options = TranscodeOptions::from_json_str(
///     r#"{"literal_layout": "sidecar", "companion_fields": ["reference__id"]}"#,
/// )
/// .unwrap();
/// assert_eq!(options.literal_layout, LiteralLayout::Sidecar);
/// assert_eq!(options.max_depth, 512);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeOptions {
    /// Exact keys that only accompany reference values inside the store.
    /// They are dropped on decode and refused on encode.
    pub companion_fields: Vec<String>,
    /// Key prefixes treated like `companion_fields`.
    pub companion_prefixes: Vec<String>,
    /// Prefix of markers holding records included by forward reference.
    pub forward_marker_prefix: String,
    /// Prefix of markers holding records included by reverse reference.
    pub reverse_marker_prefix: String,
    /// Deepest nesting of sub-trees and arrays accepted in either direction.
    pub max_depth: usize,
    pub literal_layout: LiteralLayout,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            companion_fields: vec![
                "reference__id".to_string(),
                "reference__type".to_string(),
                "reference__external".to_string(),
            ],
            companion_prefixes: vec!["_lookup".to_string()],
            forward_marker_prefix: "_included".to_string(),
            reverse_marker_prefix: "_revIncluded".to_string(),
            max_depth: 512,
            literal_layout: LiteralLayout::Native,
        }
    }
}

impl TranscodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads options from JSON; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn with_literal_layout(mut self, layout: LiteralLayout) -> Self {
        self.literal_layout = layout;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_companion_field(mut self, key: impl Into<String>) -> Self {
        self.companion_fields.push(key.into());
        self
    }

    #[must_use]
    pub fn with_companion_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.companion_prefixes.push(prefix.into());
        self
    }

    pub fn is_companion(&self, key: &str) -> bool {
        self.companion_fields.iter().any(|f| f == key)
            || self
                .companion_prefixes
                .iter()
                .any(|p| key.starts_with(p.as_str()))
    }

    /// Classifies `key` as a side-document marker. Case-sensitive.
    pub fn marker_kind(&self, key: &str) -> Option<MarkerKind> {
        // Longer prefix wins.
        let (first, first_kind, second, second_kind) =
            if self.reverse_marker_prefix.len() >= self.forward_marker_prefix.len() {
                (
                    &self.reverse_marker_prefix,
                    MarkerKind::Reverse,
                    &self.forward_marker_prefix,
                    MarkerKind::Forward,
                )
            } else {
                (
                    &self.forward_marker_prefix,
                    MarkerKind::Forward,
                    &self.reverse_marker_prefix,
                    MarkerKind::Reverse,
                )
            };
        if !first.is_empty() && key.starts_with(first.as_str()) {
            Some(first_kind)
        } else if !second.is_empty() && key.starts_with(second.as_str()) {
            Some(second_kind)
        } else {
            None
        }
    }

    pub fn is_marker(&self, key: &str) -> bool {
        self.marker_kind(key).is_some()
    }
}

/// Declared scalar kinds for fields of external records, keyed by field
/// name.
///
/// The JSON reader consults it to tell temporal strings from plain text and
/// to override its default number classification.
///
/// ```
/// use fhirstore_transcode::{KindTable, ScalarKind};
///
/// let kinds = KindTable::new()
///     .declare("birthDate", ScalarKind::Temporal)
///     .declare("value", ScalarKind::Decimal);
/// assert_eq!(kinds.kind_of("birthDate"), Some(ScalarKind::Temporal));
/// assert_eq!(kinds.kind_of("gender"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindTable {
    kinds: IndexMap<String, ScalarKind>,
}

impl KindTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn declare(mut self, field: impl Into<String>, kind: ScalarKind) -> Self {
        self.kinds.insert(field.into(), kind);
        self
    }

    pub fn kind_of(&self, field: &str) -> Option<ScalarKind> {
        self.kinds.get(field).copied()
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_companions() {
        let options = TranscodeOptions::default();
        assert!(options.is_companion("reference__id"));
        assert!(options.is_companion("reference__type"));
        assert!(options.is_companion("reference__external"));
        assert!(options.is_companion("_lookupPatient"));
        assert!(!options.is_companion("reference"));
    }

    #[test]
    fn test_companion_list_is_configurable() {
        let options = TranscodeOptions::default().with_companion_field("reference__display");
        assert!(options.is_companion("reference__display"));
    }

    #[test]
    fn test_marker_kind() {
        let options = TranscodeOptions::default();
        assert_eq!(
            options.marker_kind("_includedPatientResourcesByEncounterSubject"),
            Some(MarkerKind::Forward)
        );
        assert_eq!(
            options.marker_kind("_revIncludedEncounterResourcesReferencingSubject"),
            Some(MarkerKind::Reverse)
        );
        assert_eq!(options.marker_kind("_IncludedPatient"), None);
        assert_eq!(options.marker_kind("included"), None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = TranscodeOptions::from_json_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(options.max_depth, 8);
        assert_eq!(options.forward_marker_prefix, "_included");
        assert_eq!(options.literal_layout, LiteralLayout::Native);
    }

    #[test]
    fn test_kind_table_from_json() {
        let kinds =
            KindTable::from_json_str(r#"{"effectiveDateTime": "temporal", "weight": "float"}"#)
                .unwrap();
        assert_eq!(kinds.kind_of("effectiveDateTime"), Some(ScalarKind::Temporal));
        assert_eq!(kinds.kind_of("weight"), Some(ScalarKind::Float));
        assert_eq!(kinds.len(), 2);
    }
}
