//! Extension codec.
//!
//! Externally an `extension` (or `modifierExtension`) field is an array of
//! objects, each carrying a `url` plus arbitrary payload fields:
//!
//! ```text
//! [ { "url": "http://example.org/ext", "valueInteger": 5 } ]
//! ```
//!
//! In the store each element is re-keyed by its url, so the element is a
//! single-entry sub-tree whose key is the url and whose value holds the
//! payload:
//!
//! ```text
//! [ { "http://example.org/ext": { "valueInteger": 5 } } ]
//! ```
//!
//! This module only performs the re-keying. The walker transcodes the
//! payload fields themselves, so nested extensions and literals inside a
//! payload follow the ordinary rules.

use fhirstore_pointer::FieldPath;

use crate::error::{ExtensionDefect, Result, TranscodeError};
use crate::value::{Fields, Value};

pub const EXTENSION: &str = "extension";
pub const MODIFIER_EXTENSION: &str = "modifierExtension";
/// Identifier field of an external extension element.
pub const URL: &str = "url";

pub fn is_extension_field(key: &str) -> bool {
    key == EXTENSION || key == MODIFIER_EXTENSION
}

/// Returns the elements of an extension field, which must be an array.
pub fn elements<'a>(value: &'a Value, path: &FieldPath) -> Result<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(TranscodeError::TypeMismatch {
            path: path.clone(),
            expected: "array",
            found: other.kind_name(),
        }),
    }
}

/// Turns one stored element into its external fields: `url` first, then the
/// payload fields in stored order.
pub fn unfold_element(element: &Value, path: &FieldPath) -> Result<Fields> {
    let entries = sub_tree(element, path)?;
    if entries.len() != 1 {
        return Err(TranscodeError::MalformedExtension {
            path: path.clone(),
            defect: ExtensionDefect::EntryCount(entries.len()),
        });
    }
    let (url, payload) = &entries[0];
    let payload = sub_tree(payload, &path.key(url.as_str()))?;

    let mut fields = Vec::with_capacity(1 + payload.len());
    fields.push((URL.to_string(), Value::Text(url.clone())));
    fields.extend(payload.iter().cloned());
    Ok(fields)
}

/// Splits an external element into its url and the remaining payload
/// fields, which keep their order.
pub fn split_url<'a>(
    element: &'a Value,
    path: &FieldPath,
) -> Result<(&'a str, Vec<&'a (String, Value)>)> {
    let fields = sub_tree(element, path)?;
    let mut url = None;
    let mut payload = Vec::with_capacity(fields.len().saturating_sub(1));
    for entry in fields {
        if entry.0 != URL {
            payload.push(entry);
            continue;
        }
        if url.is_some() {
            return Err(TranscodeError::MalformedExtension {
                path: path.clone(),
                defect: ExtensionDefect::DuplicateUrl,
            });
        }
        match &entry.1 {
            Value::Text(text) => url = Some(text.as_str()),
            _ => {
                return Err(TranscodeError::MalformedExtension {
                    path: path.key(URL),
                    defect: ExtensionDefect::UrlNotText,
                })
            }
        }
    }
    let url = url.ok_or_else(|| TranscodeError::MalformedExtension {
        path: path.clone(),
        defect: ExtensionDefect::MissingUrl,
    })?;
    Ok((url, payload))
}

/// Builds the stored single-entry element from a url and already-encoded
/// payload fields.
pub fn fold_element(url: &str, payload: Fields) -> Value {
    Value::SubTree(vec![(url.to_string(), Value::SubTree(payload))])
}

fn sub_tree<'a>(value: &'a Value, path: &FieldPath) -> Result<&'a [(String, Value)]> {
    match value {
        Value::SubTree(fields) => Ok(fields),
        other => Err(TranscodeError::TypeMismatch {
            path: path.clone(),
            expected: "sub-tree",
            found: other.kind_name(),
        }),
    }
}
