//! Parses external JSON text into records.
//!
//! Unlike general-purpose JSON parsers this reader:
//! - keeps object keys in order, duplicates included;
//! - never rounds numbers: integers that fit `i64` become
//!   [`Value::Integer`], every other number keeps its text as
//!   [`Value::Decimal`];
//! - consults a [`KindTable`] to tell temporal strings from text and to
//!   override number classification for declared fields.

use fhirstore_pointer::FieldPath;

use crate::error::{Result, TranscodeError};
use crate::json::render::DEFAULT_MAX_DEPTH;
use crate::options::KindTable;
use crate::scalar::ScalarKind;
use crate::value::{ExternalRecord, Value};

pub struct JsonReader<'a> {
    data: &'a [u8],
    x: usize,
    kinds: &'a KindTable,
    max_depth: usize,
}

impl<'a> JsonReader<'a> {
    pub fn new(data: &'a [u8], kinds: &'a KindTable) -> Self {
        Self {
            data,
            x: 0,
            kinds,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reads a single top-level object.
    ///
    /// The record itself sits at depth 0, as in
    /// [`JsonRenderer::render_record`](crate::json::JsonRenderer::render_record).
    pub fn read_record(mut self) -> Result<ExternalRecord> {
        self.skip_ws();
        if self.data.get(self.x) != Some(&b'{') {
            return Err(self.err());
        }
        let start = self.x;
        let value = self.read_obj(&FieldPath::root(), 0)?;
        self.finish()?;
        match value {
            Value::SubTree(fields) => Ok(ExternalRecord::from_fields(fields)),
            _ => Err(TranscodeError::Json { offset: start }),
        }
    }

    /// Reads a single top-level value of any kind.
    pub fn read_value(mut self) -> Result<Value> {
        let value = self.read_any(None, &FieldPath::root(), 0)?;
        self.finish()?;
        Ok(value)
    }

    fn finish(&mut self) -> Result<()> {
        self.skip_ws();
        if self.x != self.data.len() {
            return Err(self.err());
        }
        Ok(())
    }

    fn err(&self) -> TranscodeError {
        TranscodeError::Json { offset: self.x }
    }

    fn read_any(&mut self, field: Option<&str>, path: &FieldPath, depth: usize) -> Result<Value> {
        self.skip_ws();
        let Some(&c) = self.data.get(self.x) else {
            return Err(self.err());
        };
        match c {
            b'"' => {
                let text = self.read_string()?;
                match field.and_then(|f| self.kinds.kind_of(f)) {
                    Some(ScalarKind::Temporal) => Ok(Value::Temporal(text)),
                    _ => Ok(Value::Text(text)),
                }
            }
            b'[' => self.read_array(field, path, depth + 1),
            b'{' => self.read_obj(path, depth + 1),
            b't' => self.read_word(b"true", Value::Bool(true)),
            b'f' => self.read_word(b"false", Value::Bool(false)),
            b'n' => self.read_word(b"null", Value::Null),
            b'-' | b'0'..=b'9' => self.read_num(field, path),
            _ => Err(self.err()),
        }
    }

    fn skip_ws(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.data.get(self.x) {
            self.x += 1;
        }
    }

    fn read_word(&mut self, word: &[u8], value: Value) -> Result<Value> {
        if !self.data[self.x..].starts_with(word) {
            return Err(self.err());
        }
        self.x += word.len();
        Ok(value)
    }

    fn read_num(&mut self, field: Option<&str>, path: &FieldPath) -> Result<Value> {
        let start = self.x;
        let len = self.data.len();
        let mut x = self.x;
        let digit = |x: usize| x < len && self.data[x].is_ascii_digit();
        if x < len && self.data[x] == b'-' {
            x += 1;
        }
        while digit(x) {
            x += 1;
        }
        let mut is_integer = true;
        if x < len && self.data[x] == b'.' {
            is_integer = false;
            x += 1;
            while digit(x) {
                x += 1;
            }
        }
        if x < len && (self.data[x] == b'e' || self.data[x] == b'E') {
            is_integer = false;
            x += 1;
            if x < len && (self.data[x] == b'+' || self.data[x] == b'-') {
                x += 1;
            }
            while digit(x) {
                x += 1;
            }
        }
        // Only ASCII was consumed.
        let text = std::str::from_utf8(&self.data[start..x]).map_err(|_| self.err())?;
        if !crate::scalar::is_json_number(text) {
            return Err(TranscodeError::Json { offset: start });
        }
        self.x = x;

        let declared = field.and_then(|f| self.kinds.kind_of(f));
        let literal = |kind| crate::scalar::encode_literal(text, kind, path);
        match declared {
            Some(ScalarKind::Decimal) => literal(ScalarKind::Decimal),
            Some(ScalarKind::Float) => literal(ScalarKind::Float),
            Some(ScalarKind::Integer) => literal(ScalarKind::Integer),
            _ => match text.parse::<i64>() {
                Ok(i) if is_integer => Ok(Value::Integer(i)),
                _ => Ok(Value::Decimal(text.to_string())),
            },
        }
    }

    fn read_string(&mut self) -> Result<String> {
        let start = self.x;
        let end = self.find_end_quote(start + 1)?;
        let slice = &self.data[start..=end];
        let s = serde_json::from_slice::<String>(slice)
            .map_err(|_| TranscodeError::Json { offset: start })?;
        self.x = end + 1;
        Ok(s)
    }

    fn find_end_quote(&self, start: usize) -> Result<usize> {
        let mut i = start;
        while i < self.data.len() {
            match self.data[i] {
                b'\\' => i += 2,
                b'"' => return Ok(i),
                _ => i += 1,
            }
        }
        Err(TranscodeError::Json { offset: start })
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

    /// Array elements inherit the declared kind of the field holding them.
    fn read_array(&mut self, field: Option<&str>, path: &FieldPath, depth: usize) -> Result<Value> {
        self.check_depth(path, depth)?;
        self.x += 1;
        let mut arr = Vec::new();
        loop {
            self.skip_ws();
            match self.data.get(self.x) {
                Some(b']') if arr.is_empty() => {
                    self.x += 1;
                    return Ok(Value::Array(arr));
                }
                None => return Err(self.err()),
                _ => {}
            }
            let item_path = path.index(arr.len());
            arr.push(self.read_any(field, &item_path, depth)?);
            self.skip_ws();
            match self.data.get(self.x) {
                Some(b',') => self.x += 1,
                Some(b']') => {
                    self.x += 1;
                    return Ok(Value::Array(arr));
                }
                _ => return Err(self.err()),
            }
        }
    }

    fn read_obj(&mut self, path: &FieldPath, depth: usize) -> Result<Value> {
        self.check_depth(path, depth)?;
        self.x += 1;
        let mut fields = Vec::new();
        loop {
            self.skip_ws();
            match self.data.get(self.x) {
                Some(b'}') if fields.is_empty() => {
                    self.x += 1;
                    return Ok(Value::SubTree(fields));
                }
                Some(b'"') => {}
                _ => return Err(self.err()),
            }
            let key = self.read_string()?;
            self.skip_ws();
            if self.data.get(self.x) != Some(&b':') {
                return Err(self.err());
            }
            self.x += 1;
            let value = self.read_any(Some(&key), &path.key(key.as_str()), depth)?;
            fields.push((key, value));
            self.skip_ws();
            match self.data.get(self.x) {
                Some(b',') => self.x += 1,
                Some(b'}') => {
                    self.x += 1;
                    return Ok(Value::SubTree(fields));
                }
                _ => return Err(self.err()),
            }
        }
    }
}

/// Convenience: parse one record.
pub fn parse_record(input: &[u8], kinds: &KindTable) -> Result<ExternalRecord> {
    JsonReader::new(input, kinds).read_record()
}
