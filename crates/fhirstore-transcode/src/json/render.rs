//! Writes external records as compact JSON text.
//!
//! Decimal literals are written raw and temporal literals as strings,
//! both exactly as carried by the record.

use fhirstore_pointer::FieldPath;

use crate::error::{Result, TranscodeError};
use crate::scalar::{quote, render_literal};
use crate::value::{ExternalRecord, Value};

/// Default nesting bound, matching [`TranscodeOptions`](crate::TranscodeOptions).
pub const DEFAULT_MAX_DEPTH: usize = 512;

pub struct JsonRenderer {
    out: String,
    max_depth: usize,
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRenderer {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Renders a whole record.
    pub fn render_record(&mut self, record: &ExternalRecord) -> Result<String> {
        self.out.clear();
        self.write_obj(record.fields(), &FieldPath::root(), 0)?;
        Ok(std::mem::take(&mut self.out))
    }

    /// Renders a single value.
    pub fn render_value(&mut self, value: &Value) -> Result<String> {
        self.out.clear();
        self.write_any(value, &FieldPath::root(), 0)?;
        Ok(std::mem::take(&mut self.out))
    }

    fn write_any(&mut self, value: &Value, path: &FieldPath, depth: usize) -> Result<()> {
        match value {
            Value::SubTree(fields) => self.write_obj(fields, path, depth + 1),
            Value::Array(items) => self.write_arr(items, path, depth + 1),
            scalar => {
                let literal = render_literal(scalar, path)?;
                self.out.push_str(&literal);
                Ok(())
            }
        }
    }

    fn write_obj(&mut self, fields: &[(String, Value)], path: &FieldPath, depth: usize) -> Result<()> {
        self.check_depth(path, depth)?;
        if fields.is_empty() {
            self.out.push_str("{}");
            return Ok(());
        }
        self.out.push('{');
        for (i, (key, value)) in fields.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.out.push_str(&quote(key));
            self.out.push(':');
            self.write_any(value, &path.key(key.as_str()), depth)?;
        }
        self.out.push('}');
        Ok(())
    }

    fn write_arr(&mut self, items: &[Value], path: &FieldPath, depth: usize) -> Result<()> {
        self.check_depth(path, depth)?;
        self.out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.write_any(item, &path.index(i), depth)?;
        }
        self.out.push(']');
        Ok(())
    }

    fn check_depth(&self, path: &FieldPath, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(TranscodeError::DepthLimitExceeded {
                path: path.clone(),
                limit: self.max_depth,
            });
        }
        Ok(())
    }
}

/// Convenience: render a record with default settings.
pub fn render_record(record: &ExternalRecord) -> Result<String> {
    JsonRenderer::new().render_record(record)
}
