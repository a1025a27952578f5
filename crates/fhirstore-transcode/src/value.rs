//! Value model shared by stored document trees and external records.
//!
//! Both sides are ordered sequences of `(key, value)` pairs. Keys are not
//! required to be unique and their order is significant, so neither side
//! is backed by a map.

/// Ordered key/value pairs of one sub-tree or record.
pub type Fields = Vec<(String, Value)>;

/// A value kind the storage engine can hold but the transcoder has no rule
/// for (binary blobs, engine-generated ids, script code and the like).
///
/// Storage adapters surface such values instead of dropping them so that
/// the transcoder can refuse them loudly.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueValue {
    /// Engine-specific type name, used in error messages.
    pub kind: String,
    pub data: Vec<u8>,
}

/// Content of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    /// Calendar/time text kept exactly as written (`"2020"`, `"2020-01"`, ...).
    Temporal(String),
    /// Numeric text kept exactly as written (`"1.50"`, `"1e-3"`, ...).
    Decimal(String),
    Text(String),
    SubTree(Fields),
    /// Heterogeneous; `Null` elements keep their position.
    Array(Vec<Value>),
    Opaque(OpaqueValue),
}

impl Value {
    /// Short kind name for diagnostics and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Temporal(_) => "temporal",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::SubTree(_) => "sub-tree",
            Value::Array(_) => "array",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Builds a sub-tree from borrowed keys.
    pub fn sub_tree<'a>(fields: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Value::SubTree(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        )
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn decimal(s: impl Into<String>) -> Self {
        Value::Decimal(s.into())
    }

    pub fn temporal(s: impl Into<String>) -> Self {
        Value::Temporal(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sub_tree(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::SubTree(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

/// Returns the first value stored under `key`.
pub fn find_field<'a>(fields: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
    fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

macro_rules! ordered_fields_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            fields: Fields,
        }

        impl $name {
            pub fn new() -> Self {
                Self { fields: Vec::new() }
            }

            pub fn from_fields(fields: Fields) -> Self {
                Self { fields }
            }

            pub fn push(&mut self, key: impl Into<String>, value: Value) {
                self.fields.push((key.into(), value));
            }

            /// Builder-style [`push`](Self::push).
            #[must_use]
            pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
                self.push(key, value);
                self
            }

            /// First value stored under `key`.
            pub fn get(&self, key: &str) -> Option<&Value> {
                find_field(&self.fields, key)
            }

            pub fn contains_key(&self, key: &str) -> bool {
                self.get(key).is_some()
            }

            pub fn fields(&self) -> &[(String, Value)] {
                &self.fields
            }

            pub fn into_fields(self) -> Fields {
                self.fields
            }

            pub fn keys(&self) -> impl Iterator<Item = &str> {
                self.fields.iter().map(|(k, _)| k.as_str())
            }

            pub fn iter(&self) -> std::slice::Iter<'_, (String, Value)> {
                self.fields.iter()
            }

            pub fn len(&self) -> usize {
                self.fields.len()
            }

            pub fn is_empty(&self) -> bool {
                self.fields.is_empty()
            }
        }

        impl From<Fields> for $name {
            fn from(fields: Fields) -> Self {
                Self { fields }
            }
        }

        impl<K: Into<String>> FromIterator<(K, Value)> for $name {
            fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
                Self {
                    fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
                }
            }
        }

        impl<'a> IntoIterator for &'a $name {
            type Item = &'a (String, Value);
            type IntoIter = std::slice::Iter<'a, (String, Value)>;

            fn into_iter(self) -> Self::IntoIter {
                self.fields.iter()
            }
        }
    };
}

ordered_fields_type!(
    /// One storage-engine document: ordered, possibly duplicate-keyed.
    DocumentTree
);

ordered_fields_type!(
    /// One record in its canonical external form.
    ExternalRecord
);
