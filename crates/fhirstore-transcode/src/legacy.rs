//! Legacy temporal shim.
//!
//! Older writers stored timestamps as a two-field sub-tree
//! `{ time: <instant>, precision: <text> }` instead of a flat temporal
//! literal. There is no version tag; the shape is recognized structurally.
//!
//! The sub-tree must consist of exactly one `time` entry holding a temporal
//! value and exactly one `precision` entry holding text, both non-empty.
//! Any additional field disables the shim and the sub-tree is decoded as an
//! ordinary nested object.
//!
//! Decode only. Nothing is ever written in this shape; the encoder refuses
//! external objects that would be mistaken for it.

use crate::value::Value;

pub const LEGACY_TIME: &str = "time";
pub const LEGACY_PRECISION: &str = "precision";

/// Returns the pre-rendered instant text if `fields` is a legacy temporal
/// sub-tree.
pub fn legacy_instant(fields: &[(String, Value)]) -> Option<&str> {
    if fields.len() != 2 {
        return None;
    }
    let mut instant = None;
    let mut has_precision = false;
    for (key, value) in fields {
        match (key.as_str(), value) {
            (LEGACY_TIME, Value::Temporal(text)) if instant.is_none() && !text.is_empty() => {
                instant = Some(text)
            }
            (LEGACY_PRECISION, Value::Text(precision)) if !has_precision && !precision.is_empty() => {
                has_precision = true
            }
            _ => return None,
        }
    }
    match (instant, has_precision) {
        (Some(text), true) => Some(text.as_str()),
        _ => None,
    }
}

/// True when `fields` would be taken for the legacy shape on decode.
pub fn is_legacy_shape(fields: &[(String, Value)]) -> bool {
    legacy_instant(fields).is_some()
}
