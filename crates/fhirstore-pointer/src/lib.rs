//! Field paths for stored and external records.
//!
//! A [`FieldPath`] names one value inside a record as a sequence of field
//! names and array positions. Paths format as JSON Pointers
//! ([RFC 6901](https://tools.ietf.org/html/rfc6901)), which is how the
//! transcoder reports where a failure happened.
//!
//! # Example
//!
//! ```
//! use fhirstore_pointer::FieldPath;
//!
//! let path = FieldPath::root().key("extension").index(2).key("url");
//! assert_eq!(path.to_string(), "/extension/2/url");
//!
//! let parsed = FieldPath::parse("/extension/2/url").unwrap();
//! assert_eq!(parsed, path);
//! ```

use std::fmt;

use thiserror::Error;

pub mod types;
pub use types::PathStep;

/// Unescapes a path component.
///
/// Per RFC 6901, `~1` is replaced with `/` and `~0` is replaced with `~`.
///
/// ```
/// use fhirstore_pointer::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// ```
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // ~1 must be replaced before ~0
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a path component.
///
/// Extension identifiers are URLs, so `/` shows up in keys all the time.
///
/// ```
/// use fhirstore_pointer::escape_component;
///
/// assert_eq!(escape_component("http://x.org/ext"), "http:~1~1x.org~1ext");
/// assert_eq!(escape_component("plain"), "plain");
/// ```
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    // ~ must be escaped before /
    component.replace('~', "~0").replace('/', "~1")
}

/// Checks if a string is a canonical non-negative array index.
///
/// ```
/// use fhirstore_pointer::is_valid_index;
///
/// assert!(is_valid_index("0"));
/// assert!(is_valid_index("12"));
/// assert!(!is_valid_index("01"));
/// assert!(!is_valid_index("-1"));
/// ```
pub fn is_valid_index(index: &str) -> bool {
    if index.is_empty() {
        return false;
    }
    let bytes = index.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("POINTER_INVALID")]
    PointerInvalid,
    #[error("NO_PARENT")]
    NoParent,
}

/// Location of a value inside a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    steps: Vec<PathStep>,
}

impl FieldPath {
    /// The path of the record itself.
    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// Parses a pointer string.
    ///
    /// Components that are canonical array indices become
    /// [`PathStep::Index`]; everything else is a key.
    pub fn parse(pointer: &str) -> Result<Self, PathError> {
        if pointer.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = pointer.strip_prefix('/') else {
            return Err(PathError::PointerInvalid);
        };
        let steps = rest
            .split('/')
            .map(|component| {
                if is_valid_index(component) {
                    match component.parse::<usize>() {
                        Ok(i) => PathStep::Index(i),
                        Err(_) => PathStep::Key(component.to_string()),
                    }
                } else {
                    PathStep::Key(unescape_component(component))
                }
            })
            .collect();
        Ok(Self { steps })
    }

    /// Returns a new path extended by a field name.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Key(key.into()));
        Self { steps }
    }

    /// Returns a new path extended by an array position.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Index(index));
        Self { steps }
    }

    pub fn push(&mut self, step: impl Into<PathStep>) {
        self.steps.push(step.into());
    }

    pub fn pop(&mut self) -> Option<PathStep> {
        self.steps.pop()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&PathStep> {
        self.steps.last()
    }

    /// Returns the enclosing path.
    pub fn parent(&self) -> Result<Self, PathError> {
        if self.steps.is_empty() {
            return Err(PathError::NoParent);
        }
        Ok(Self {
            steps: self.steps[..self.steps.len() - 1].to_vec(),
        })
    }

    /// Checks if `child` lies strictly below this path.
    pub fn is_parent_of(&self, child: &FieldPath) -> bool {
        self.steps.len() < child.steps.len() && child.steps.starts_with(&self.steps)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

impl FromIterator<PathStep> for FieldPath {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}
