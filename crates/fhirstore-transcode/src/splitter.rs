//! Side-document splitter.
//!
//! A search with `_include` / `_revinclude` leaves related records on the
//! primary stored tree under marker keys (`_included...` and
//! `_revIncluded...`), each holding an array of stored trees. They are
//! split off before the primary record is decoded and returned separately,
//! in input order.
//!
//! One level of inclusion is the maximum: a side document carrying markers
//! of its own is rejected.

use std::fmt;

use fhirstore_pointer::FieldPath;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TranscodeError};
use crate::options::TranscodeOptions;
use crate::value::{ExternalRecord, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Included because the primary record references it.
    Forward,
    /// Included because it references the primary record.
    Reverse,
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerKind::Forward => f.write_str("forward"),
            MarkerKind::Reverse => f.write_str("reverse"),
        }
    }
}

/// One decoded side document and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SideDocument {
    pub marker: String,
    pub kind: MarkerKind,
    /// Position inside the marker's array.
    pub index: usize,
    pub record: ExternalRecord,
}

/// Side documents of one decoded tree, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideDocumentSet {
    documents: Vec<SideDocument>,
}

impl SideDocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, document: SideDocument) {
        self.documents.push(document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SideDocument> {
        self.documents.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &ExternalRecord> {
        self.documents.iter().map(|d| &d.record)
    }

    pub fn into_records(self) -> Vec<ExternalRecord> {
        self.documents.into_iter().map(|d| d.record).collect()
    }

    /// Groups documents back into marker arrays.
    ///
    /// A new group starts whenever the marker changes or an index restarts
    /// at zero, which reproduces the arrays the set was split from.
    pub fn groups(&self) -> Vec<(&str, Vec<&ExternalRecord>)> {
        let mut groups: Vec<(&str, Vec<&ExternalRecord>)> = Vec::new();
        for doc in &self.documents {
            let continues = doc.index != 0
                && matches!(groups.last(), Some((marker, _)) if *marker == doc.marker);
            if continues {
                if let Some((_, records)) = groups.last_mut() {
                    records.push(&doc.record);
                    continue;
                }
            }
            groups.push((doc.marker.as_str(), vec![&doc.record]));
        }
        groups
    }
}

impl<'a> IntoIterator for &'a SideDocumentSet {
    type Item = &'a SideDocument;
    type IntoIter = std::slice::Iter<'a, SideDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

impl IntoIterator for SideDocumentSet {
    type Item = SideDocument;
    type IntoIter = std::vec::IntoIter<SideDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

/// Primary entries left after splitting, plus the marker entries found.
pub struct Split<'a> {
    pub primary: Vec<&'a (String, Value)>,
    pub markers: Vec<(&'a str, MarkerKind, &'a Value)>,
}

/// Separates marker entries from primary entries, keeping both in order.
pub fn partition<'a>(fields: &'a [(String, Value)], options: &TranscodeOptions) -> Split<'a> {
    let mut primary = Vec::with_capacity(fields.len());
    let mut markers = Vec::new();
    for entry in fields {
        match options.marker_kind(&entry.0) {
            Some(kind) => markers.push((entry.0.as_str(), kind, &entry.1)),
            None => primary.push(entry),
        }
    }
    Split { primary, markers }
}

/// Decodes every element of every marker array with `decode_one`.
///
/// A failure in any element aborts the whole split; it is wrapped with the
/// marker name and index that failed. An element carrying marker keys of its
/// own is rejected before decoding.
pub fn decode_side_documents<F>(
    markers: &[(&str, MarkerKind, &Value)],
    options: &TranscodeOptions,
    mut decode_one: F,
) -> Result<SideDocumentSet>
where
    F: FnMut(&[(String, Value)]) -> Result<ExternalRecord>,
{
    let mut set = SideDocumentSet::new();
    for &(marker, kind, value) in markers {
        let elements = match value {
            Value::Array(items) => items,
            other => {
                return Err(TranscodeError::TypeMismatch {
                    path: FieldPath::root().key(marker),
                    expected: "array",
                    found: other.kind_name(),
                })
            }
        };
        for (index, element) in elements.iter().enumerate() {
            let fields = match element {
                Value::SubTree(fields) => fields,
                other => {
                    return Err(TranscodeError::TypeMismatch {
                        path: FieldPath::root().key(marker).index(index),
                        expected: "sub-tree",
                        found: other.kind_name(),
                    })
                }
            };
            if let Some((nested, _)) = fields.iter().find(|(k, _)| options.is_marker(k)) {
                return Err(TranscodeError::NestedSideDocument {
                    marker: marker.to_string(),
                    index,
                    nested: nested.clone(),
                });
            }
            let record = decode_one(fields)
                .map_err(|e| TranscodeError::side_document(marker, index, e))?;
            set.push(SideDocument {
                marker: marker.to_string(),
                kind,
                index,
                record,
            });
        }
    }
    Ok(set)
}
