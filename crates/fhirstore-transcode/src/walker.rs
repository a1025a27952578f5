//! Tree walker: whole-record transcoding in both directions.
//!
//! Decode runs the splitter over the top of a stored tree, then walks the
//! remaining entries in order, collapsing sidecar and legacy sub-trees,
//! unfolding extensions, dropping reference companions and renaming the
//! identity keys. Encode is the mirror image and refuses external shapes
//! that decode could not give back.
//!
//! Recursion is bounded by [`TranscodeOptions::max_depth`].

use std::fmt;
use std::sync::Arc;

use fhirstore_pointer::FieldPath;

use crate::diagnostics::{Diagnostic, DiagnosticSink, NoopSink};
use crate::error::{Result, TranscodeError};
use crate::extension;
use crate::legacy;
use crate::options::{LiteralLayout, TranscodeOptions};
use crate::scalar;
use crate::splitter::{self, SideDocumentSet};
use crate::value::{DocumentTree, ExternalRecord, Fields, Value};

/// Identity key substitutions as `(stored, external)` pairs.
const IDENTITY_RENAMES: [(&str, &str); 2] = [("_id", "id"), ("__id", "_id")];

fn external_key(stored: &str) -> &str {
    IDENTITY_RENAMES
        .iter()
        .find(|(s, _)| *s == stored)
        .map_or(stored, |(_, e)| *e)
}

fn stored_key(external: &str) -> &str {
    IDENTITY_RENAMES
        .iter()
        .find(|(_, e)| *e == external)
        .map_or(external, |(s, _)| *s)
}

/// Result of decoding one stored tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub record: ExternalRecord,
    pub side_documents: SideDocumentSet,
}

/// Stateless driver for both transcoding directions.
///
/// A `Transcoder` holds only configuration; every call works on its own
/// input, so one instance can serve any number of threads.
#[derive(Clone)]
pub struct Transcoder {
    options: TranscodeOptions,
    sink: Arc<dyn DiagnosticSink>,
}

impl fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcoder")
            .field("options", &self.options)
            .field("diagnostics", &self.sink.enabled())
            .finish()
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcoder {
    pub fn new() -> Self {
        Self::with_options(TranscodeOptions::default())
    }

    pub fn with_options(options: TranscodeOptions) -> Self {
        Self {
            options,
            sink: Arc::new(NoopSink),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn options(&self) -> &TranscodeOptions {
        &self.options
    }

    fn emit(&self, make: impl FnOnce() -> Diagnostic) {
        if self.sink.enabled() {
            self.sink.event(&make());
        }
    }

    fn check_depth(&self, path: &FieldPath, depth: usize) -> Result<()> {
        if depth > self.options.max_depth {
            return Err(TranscodeError::DepthLimitExceeded {
                path: path.clone(),
                limit: self.options.max_depth,
            });
        }
        Ok(())
    }

    // ----------------------------------------------------------------
    // Decode

    /// Decodes a stored tree into its external record and side documents.
    pub fn decode(&self, tree: &DocumentTree) -> Result<Decoded> {
        let split = splitter::partition(tree.fields(), &self.options);
        for &(marker, kind, value) in &split.markers {
            self.emit(|| Diagnostic::SideDocumentsSplit {
                marker: marker.to_string(),
                kind,
                count: value.as_array().map_or(0, <[Value]>::len),
            });
        }

        let side_documents =
            splitter::decode_side_documents(&split.markers, &self.options, |fields| {
                self.decode_record(fields)
            })?;
        let record = self.decode_record(split.primary)?;
        Ok(Decoded {
            record,
            side_documents,
        })
    }

    fn decode_record<'a, I>(&self, entries: I) -> Result<ExternalRecord>
    where
        I: IntoIterator<Item = &'a (String, Value)>,
    {
        self.decode_entries(entries, &FieldPath::root(), 0)
            .map(ExternalRecord::from_fields)
    }

    fn decode_entries<'a, I>(&self, entries: I, path: &FieldPath, depth: usize) -> Result<Fields>
    where
        I: IntoIterator<Item = &'a (String, Value)>,
    {
        let entries = entries.into_iter();
        let mut out = Vec::with_capacity(entries.size_hint().0);
        for (key, value) in entries {
            if self.options.is_companion(key) {
                self.emit(|| Diagnostic::CompanionSkipped {
                    path: path.key(key.as_str()),
                });
                continue;
            }
            if self.options.is_marker(key) {
                self.emit(|| Diagnostic::NestedMarkerSkipped {
                    path: path.key(key.as_str()),
                });
                continue;
            }

            let field_path = path.key(key.as_str());
            let decoded = if extension::is_extension_field(key) {
                self.decode_extensions(value, &field_path, depth)?
            } else {
                self.decode_value(value, &field_path, depth)?
            };
            out.push((external_key(key).to_string(), decoded));
        }
        Ok(out)
    }

    fn decode_value(&self, value: &Value, path: &FieldPath, depth: usize) -> Result<Value> {
        match value {
            Value::Null
            | Value::Bool(_)
            | Value::Integer(_)
            | Value::Float(_)
            | Value::Temporal(_)
            | Value::Decimal(_)
            | Value::Text(_) => Ok(value.clone()),
            Value::SubTree(fields) => self.decode_sub_tree(fields, path, depth + 1),
            Value::Array(items) => {
                self.check_depth(path, depth + 1)?;
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.decode_value(item, &path.index(i), depth + 1)?);
                }
                Ok(Value::Array(out))
            }
            Value::Opaque(opaque) => Err(TranscodeError::UnrecognizedValueKind {
                path: path.clone(),
                kind: opaque.kind.clone(),
            }),
        }
    }

    fn decode_sub_tree(
        &self,
        fields: &[(String, Value)],
        path: &FieldPath,
        depth: usize,
    ) -> Result<Value> {
        self.check_depth(path, depth)?;

        if let Some(literal) = scalar::sidecar_literal(fields, path)? {
            self.emit(|| Diagnostic::SidecarLiteral { path: path.clone() });
            return Ok(literal);
        }
        if let Some(instant) = legacy::legacy_instant(fields) {
            self.emit(|| Diagnostic::LegacyTemporalShim { path: path.clone() });
            return Ok(Value::Temporal(instant.to_string()));
        }

        self.decode_entries(fields, path, depth).map(Value::SubTree)
    }

    fn decode_extensions(&self, value: &Value, path: &FieldPath, depth: usize) -> Result<Value> {
        let items = extension::elements(value, path)?;
        self.check_depth(path, depth + 1)?;
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let element_path = path.index(i);
            let fields = extension::unfold_element(item, &element_path)?;
            self.check_depth(&element_path, depth + 2)?;
            let decoded = self.decode_entries(&fields, &element_path, depth + 2)?;
            out.push(Value::SubTree(decoded));
        }
        Ok(Value::Array(out))
    }

    // ----------------------------------------------------------------
    // Encode

    /// Encodes an external record into a stored tree.
    ///
    /// Top-level marker keys holding arrays of records are encoded as side
    /// documents and appended after the primary fields.
    pub fn encode(&self, record: &ExternalRecord) -> Result<DocumentTree> {
        let root = FieldPath::root();
        let mut primary = Vec::with_capacity(record.len());
        let mut markers = Vec::new();
        for entry in record.fields() {
            if self.options.is_marker(&entry.0) {
                markers.push(entry);
            } else {
                primary.push(entry);
            }
        }

        let mut out = self.encode_entries(primary, &root, 0)?;
        for (marker, value) in markers {
            let items = match value {
                Value::Array(items) => items,
                other => {
                    return Err(TranscodeError::TypeMismatch {
                        path: root.key(marker.as_str()),
                        expected: "array",
                        found: other.kind_name(),
                    })
                }
            };
            let mut encoded = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let fields = item.as_sub_tree().ok_or_else(|| TranscodeError::TypeMismatch {
                    path: root.key(marker.as_str()).index(index),
                    expected: "sub-tree",
                    found: item.kind_name(),
                })?;
                encoded.push(self.encode_side_record(marker, index, fields)?);
            }
            out.push((marker.clone(), Value::Array(encoded)));
        }
        Ok(DocumentTree::from_fields(out))
    }

    /// Encodes a record and re-attaches side documents under their markers.
    pub fn encode_with_side_documents(
        &self,
        record: &ExternalRecord,
        side_documents: &SideDocumentSet,
    ) -> Result<DocumentTree> {
        let mut tree = self.encode(record)?.into_fields();
        for (marker, records) in side_documents.groups() {
            let mut encoded = Vec::with_capacity(records.len());
            for (index, side) in records.into_iter().enumerate() {
                encoded.push(self.encode_side_record(marker, index, side.fields())?);
            }
            tree.push((marker.to_string(), Value::Array(encoded)));
        }
        Ok(DocumentTree::from_fields(tree))
    }

    fn encode_side_record(
        &self,
        marker: &str,
        index: usize,
        fields: &[(String, Value)],
    ) -> Result<Value> {
        if let Some((nested, _)) = fields.iter().find(|(k, _)| self.options.is_marker(k)) {
            return Err(TranscodeError::NestedSideDocument {
                marker: marker.to_string(),
                index,
                nested: nested.clone(),
            });
        }
        self.encode_entries(fields, &FieldPath::root(), 0)
            .map(Value::SubTree)
            .map_err(|e| TranscodeError::side_document(marker, index, e))
    }

    fn check_reserved_key(&self, key: &str, path: &FieldPath) -> Result<()> {
        let reason = if key == "__id" {
            "key has no stored form"
        } else if self.options.is_companion(key) {
            "key is a storage-internal reference companion"
        } else if scalar::is_sidecar_key(key) {
            "key belongs to the sidecar literal layout"
        } else if self.options.is_marker(key) {
            "side-document marker below the top level"
        } else {
            return Ok(());
        };
        Err(TranscodeError::ReservedShape {
            path: path.clone(),
            reason: reason.to_string(),
        })
    }

    fn encode_entries<'a, I>(&self, entries: I, path: &FieldPath, depth: usize) -> Result<Fields>
    where
        I: IntoIterator<Item = &'a (String, Value)>,
    {
        let entries = entries.into_iter();
        let mut out = Vec::with_capacity(entries.size_hint().0);
        for (key, value) in entries {
            let field_path = path.key(key.as_str());
            self.check_reserved_key(key, &field_path)?;
            let encoded = if extension::is_extension_field(key) {
                self.encode_extensions(value, &field_path, depth)?
            } else {
                self.encode_value(value, &field_path, depth)?
            };
            out.push((stored_key(key).to_string(), encoded));
        }
        Ok(out)
    }

    fn encode_value(&self, value: &Value, path: &FieldPath, depth: usize) -> Result<Value> {
        match value {
            Value::Decimal(text) => match self.options.literal_layout {
                LiteralLayout::Native if scalar::is_json_number(text) => Ok(value.clone()),
                LiteralLayout::Native => Err(TranscodeError::InvalidLiteral {
                    path: path.clone(),
                    text: text.clone(),
                }),
                // The sidecar sub-tree is one level deeper than the literal.
                LiteralLayout::Sidecar => {
                    self.check_depth(path, depth + 1)?;
                    scalar::sidecar_decimal(text, path)
                }
            },
            Value::Temporal(text) => match self.options.literal_layout {
                LiteralLayout::Native => Ok(value.clone()),
                LiteralLayout::Sidecar => {
                    self.check_depth(path, depth + 1)?;
                    Ok(scalar::sidecar_temporal(text))
                }
            },
            Value::Null | Value::Bool(_) | Value::Integer(_) | Value::Float(_) | Value::Text(_) => {
                Ok(value.clone())
            }
            Value::SubTree(fields) => {
                self.check_depth(path, depth + 1)?;
                if legacy::is_legacy_shape(fields) {
                    return Err(TranscodeError::ReservedShape {
                        path: path.clone(),
                        reason: "object would decode as a legacy time/precision value".to_string(),
                    });
                }
                self.encode_entries(fields, path, depth + 1)
                    .map(Value::SubTree)
            }
            Value::Array(items) => {
                self.check_depth(path, depth + 1)?;
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.encode_value(item, &path.index(i), depth + 1)?);
                }
                Ok(Value::Array(out))
            }
            Value::Opaque(opaque) => Err(TranscodeError::UnrecognizedValueKind {
                path: path.clone(),
                kind: opaque.kind.clone(),
            }),
        }
    }

    fn encode_extensions(&self, value: &Value, path: &FieldPath, depth: usize) -> Result<Value> {
        let items = extension::elements(value, path)?;
        self.check_depth(path, depth + 1)?;
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let element_path = path.index(i);
            let (url, payload) = extension::split_url(item, &element_path)?;
            self.check_depth(&element_path, depth + 2)?;
            let encoded = self.encode_entries(payload, &element_path, depth + 2)?;
            out.push(extension::fold_element(url, encoded));
        }
        Ok(Value::Array(out))
    }
}
