//! Lossless transcoding between stored document trees and external FHIR
//! records.
//!
//! The store keeps records as ordered, possibly duplicate-keyed trees with a
//! few storage-driven quirks: extensions re-keyed by their url, identity
//! keys renamed, related records side-loaded under marker keys, and (in
//! older data) timestamps kept as `{time, precision}` sub-trees. This crate
//! undoes all of that on the way out and reapplies it on the way in, without
//! ever re-formatting decimal or temporal text.
//!
//! # Example
//!
//! ```
//! use fhirstore_transcode::{decode, encode, json, DocumentTree, Value};
//!
//! let stored: DocumentTree = vec![
//!     ("resourceType", Value::text("Observation")),
//!     ("_id", Value::text("o1")),
//!     ("valueDecimal", Value::decimal("1.50")),
//!     (
//!         "extension",
//!         Value::Array(vec![Value::sub_tree([(
//!             "http://example.org/ext",
//!             Value::sub_tree([("valueInteger", Value::Integer(5))]),
//!         )])]),
//!     ),
//! ]
//! .into_iter()
//! .collect();
//!
//! let decoded = decode(&stored).unwrap();
//! assert_eq!(
//!     json::render_record(&decoded.record).unwrap(),
//!     r#"{"resourceType":"Observation","id":"o1","valueDecimal":1.50,"extension":[{"url":"http://example.org/ext","valueInteger":5}]}"#
//! );
//!
//! assert_eq!(encode(&decoded.record).unwrap(), stored);
//! ```

pub mod diagnostics;
pub mod envelope;
pub mod error;
pub mod extension;
pub mod json;
pub mod legacy;
pub mod options;
pub mod scalar;
pub mod splitter;
pub mod value;
pub mod walker;

pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, NoopSink, TracingSink};
pub use envelope::{SearchEnvelope, SearchMode};
pub use error::{ExtensionDefect, Result, TranscodeError};
pub use fhirstore_pointer::{FieldPath, PathStep};
pub use options::{KindTable, LiteralLayout, TranscodeOptions};
pub use scalar::ScalarKind;
pub use splitter::{MarkerKind, SideDocument, SideDocumentSet};
pub use value::{DocumentTree, ExternalRecord, Fields, OpaqueValue, Value};
pub use walker::{Decoded, Transcoder};

/// Decodes a stored tree with default options.
pub fn decode(tree: &DocumentTree) -> Result<Decoded> {
    Transcoder::new().decode(tree)
}

/// Encodes an external record with default options.
pub fn encode(record: &ExternalRecord) -> Result<DocumentTree> {
    Transcoder::new().encode(record)
}
