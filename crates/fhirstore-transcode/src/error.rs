//! Transcoding error type.
//!
//! Every variant names the field where the failure happened so a caller can
//! report it without re-walking the input. Errors abort the whole call; no
//! partial record is ever returned next to one.

use std::fmt;

use fhirstore_pointer::FieldPath;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranscodeError>;

/// What was wrong with an extension element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionDefect {
    /// Stored element did not hold exactly one entry.
    EntryCount(usize),
    /// External element had no `url` field.
    MissingUrl,
    /// External element had more than one `url` field.
    DuplicateUrl,
    /// External element's `url` was not text.
    UrlNotText,
}

impl fmt::Display for ExtensionDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionDefect::EntryCount(n) => write!(f, "element of unexpected length {n}"),
            ExtensionDefect::MissingUrl => f.write_str("element without url"),
            ExtensionDefect::DuplicateUrl => f.write_str("element with more than one url"),
            ExtensionDefect::UrlNotText => f.write_str("url is not text"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TranscodeError {
    #[error("malformed extension at {path}: {defect}")]
    MalformedExtension {
        path: FieldPath,
        defect: ExtensionDefect,
    },

    #[error("unrecognized value kind {kind} at {path}")]
    UnrecognizedValueKind { path: FieldPath, kind: String },

    #[error("unexpected nested {nested} in side document {marker}[{index}]")]
    NestedSideDocument {
        marker: String,
        index: usize,
        nested: String,
    },

    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: FieldPath,
        expected: &'static str,
        found: &'static str,
    },

    #[error("side document {marker}[{index}] failed: {source}")]
    SideDocument {
        marker: String,
        index: usize,
        #[source]
        source: Box<TranscodeError>,
    },

    #[error("nesting deeper than {limit} at {path}")]
    DepthLimitExceeded { path: FieldPath, limit: usize },

    #[error("reserved shape at {path}: {reason}")]
    ReservedShape { path: FieldPath, reason: String },

    #[error("invalid literal {text:?} at {path}")]
    InvalidLiteral { path: FieldPath, text: String },

    #[error("invalid JSON at position {offset}")]
    Json { offset: usize },
}

impl TranscodeError {
    /// The field the failure is attributed to, when it has one.
    ///
    /// Side-document failures report the path inside the side document.
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            TranscodeError::MalformedExtension { path, .. }
            | TranscodeError::UnrecognizedValueKind { path, .. }
            | TranscodeError::TypeMismatch { path, .. }
            | TranscodeError::DepthLimitExceeded { path, .. }
            | TranscodeError::ReservedShape { path, .. }
            | TranscodeError::InvalidLiteral { path, .. } => Some(path),
            TranscodeError::SideDocument { source, .. } => source.path(),
            TranscodeError::NestedSideDocument { .. } | TranscodeError::Json { .. } => None,
        }
    }

    /// Strips side-document wrapping.
    pub fn root_cause(&self) -> &TranscodeError {
        match self {
            TranscodeError::SideDocument { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn side_document(marker: &str, index: usize, source: TranscodeError) -> Self {
        TranscodeError::SideDocument {
            marker: marker.to_string(),
            index,
            source: Box::new(source),
        }
    }
}
