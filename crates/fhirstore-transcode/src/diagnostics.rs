//! Diagnostic events emitted while transcoding.
//!
//! A [`DiagnosticSink`] is handed to the [`Transcoder`](crate::Transcoder).
//! Events never influence the result. When the sink reports itself
//! disabled, events are not even constructed.

use std::fmt;

use fhirstore_pointer::FieldPath;

use crate::splitter::MarkerKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Side documents were pulled off the top of a stored tree.
    SideDocumentsSplit {
        marker: String,
        kind: MarkerKind,
        count: usize,
    },
    /// A legacy `{time, precision}` sub-tree was collapsed to its instant.
    LegacyTemporalShim { path: FieldPath },
    /// A sidecar sub-tree was collapsed to its literal text.
    SidecarLiteral { path: FieldPath },
    /// A storage-internal reference companion was dropped.
    CompanionSkipped { path: FieldPath },
    /// A marker key showed up below the top level and was dropped.
    NestedMarkerSkipped { path: FieldPath },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SideDocumentsSplit {
                marker,
                kind,
                count,
            } => write!(f, "split {count} {kind} side documents from {marker}"),
            Diagnostic::LegacyTemporalShim { path } => {
                write!(f, "legacy time/precision value at {path}")
            }
            Diagnostic::SidecarLiteral { path } => write!(f, "sidecar literal at {path}"),
            Diagnostic::CompanionSkipped { path } => write!(f, "skipped companion {path}"),
            Diagnostic::NestedMarkerSkipped { path } => {
                write!(f, "skipped nested marker {path}")
            }
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn event(&self, diagnostic: &Diagnostic);

    fn enabled(&self) -> bool {
        true
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn event(&self, _diagnostic: &Diagnostic) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Forwards events to `tracing`.
///
/// Unusual shapes (legacy values, stray markers) are logged at `warn`,
/// the rest at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn event(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::SideDocumentsSplit {
                marker,
                kind,
                count,
            } => {
                tracing::debug!(marker = %marker, kind = %kind, count, "side documents split");
            }
            Diagnostic::LegacyTemporalShim { path } => {
                tracing::warn!(path = %path, "legacy time/precision value decoded");
            }
            Diagnostic::SidecarLiteral { path } => {
                tracing::debug!(path = %path, "sidecar literal decoded");
            }
            Diagnostic::CompanionSkipped { path } => {
                tracing::debug!(path = %path, "reference companion skipped");
            }
            Diagnostic::NestedMarkerSkipped { path } => {
                tracing::warn!(path = %path, "marker key below top level skipped");
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: std::sync::Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains the events seen so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl DiagnosticSink for CollectingSink {
    fn event(&self, diagnostic: &Diagnostic) {
        match self.events.lock() {
            Ok(mut events) => events.push(diagnostic.clone()),
            Err(poisoned) => poisoned.into_inner().push(diagnostic.clone()),
        }
    }
}
