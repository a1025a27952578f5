//! Search result envelope.
//!
//! Side documents are never inlined into their primary record. A search
//! response lists primary records as `match` entries and side documents as
//! `include` entries of one `searchset` Bundle.

use crate::splitter::SideDocumentSet;
use crate::value::{ExternalRecord, Fields, Value};
use crate::walker::Decoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Match,
    Include,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Match => "match",
            SearchMode::Include => "include",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchEnvelope {
    base_url: Option<String>,
    total: Option<usize>,
    entries: Vec<(SearchMode, ExternalRecord)>,
}

impl SearchEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base used to build each entry's `fullUrl` as `{base}/{type}/{id}`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Overrides `total`, which otherwise counts the `match` entries.
    #[must_use]
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    pub fn push_match(&mut self, record: ExternalRecord) {
        self.entries.push((SearchMode::Match, record));
    }

    pub fn push_includes(&mut self, side_documents: SideDocumentSet) {
        self.entries.extend(
            side_documents
                .into_records()
                .into_iter()
                .map(|r| (SearchMode::Include, r)),
        );
    }

    /// Adds a decoded tree: its record as a match, its side documents as
    /// includes.
    pub fn push_decoded(&mut self, decoded: Decoded) {
        self.push_match(decoded.record);
        self.push_includes(decoded.side_documents);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_record(self) -> ExternalRecord {
        let matches = self
            .entries
            .iter()
            .filter(|(mode, _)| *mode == SearchMode::Match)
            .count();
        let total = self.total.unwrap_or(matches);

        let mut bundle = ExternalRecord::new()
            .with("resourceType", Value::text("Bundle"))
            .with("type", Value::text("searchset"))
            .with("total", Value::Integer(total as i64));

        if !self.entries.is_empty() {
            let base_url = self.base_url;
            let entries = self
                .entries
                .into_iter()
                .map(|(mode, record)| entry(base_url.as_deref(), mode, record))
                .collect();
            bundle.push("entry", Value::Array(entries));
        }
        bundle
    }
}

fn entry(base_url: Option<&str>, mode: SearchMode, record: ExternalRecord) -> Value {
    let mut fields: Fields = Vec::with_capacity(3);
    if let Some(url) = base_url.and_then(|base| full_url(base, &record)) {
        fields.push(("fullUrl".to_string(), Value::Text(url)));
    }
    fields.push(("resource".to_string(), Value::SubTree(record.into_fields())));
    fields.push((
        "search".to_string(),
        Value::sub_tree([("mode", Value::text(mode.as_str()))]),
    ));
    Value::SubTree(fields)
}

fn full_url(base: &str, record: &ExternalRecord) -> Option<String> {
    let resource_type = record.get("resourceType")?.as_text()?;
    let id = record.get("id")?.as_text()?;
    Some(format!("{base}/{resource_type}/{id}"))
}
