//! Scalar codec: numbers, booleans, text and the verbatim decimal/temporal
//! literals.
//!
//! Decimal and temporal values are never parsed and re-formatted. `1.50`
//! and `1.5` are different decimals, and `2020` is a different temporal
//! value from `2020-01-01T00:00:00Z`; both sides carry the literal text.

use fhirstore_pointer::FieldPath;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TranscodeError};
use crate::value::{Fields, Value};

/// Sidecar key holding the verbatim decimal text.
pub const STR_NUM: &str = "__strNum";
/// Sidecar key holding the decimal as a float for range queries.
pub const NUM: &str = "__num";
/// Sidecar key holding the verbatim temporal text.
pub const STR_DATE: &str = "__strDate";

/// Declared kind of an external scalar literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Boolean,
    Integer,
    Float,
    Decimal,
    Temporal,
    Text,
}

/// Renders a scalar value as its external (JSON) literal.
///
/// ```
/// use fhirstore_pointer::FieldPath;
/// use fhirstore_transcode::{scalar::render_literal, Value};
///
/// let path = FieldPath::root();
/// assert_eq!(render_literal(&Value::decimal("1.50"), &path).unwrap(), "1.50");
/// assert_eq!(render_literal(&Value::temporal("2020"), &path).unwrap(), "\"2020\"");
/// ```
pub fn render_literal(value: &Value, path: &FieldPath) -> Result<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(true) => Ok("true".to_string()),
        Value::Bool(false) => Ok("false".to_string()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => format_float(*f).ok_or_else(|| TranscodeError::InvalidLiteral {
            path: path.clone(),
            text: f.to_string(),
        }),
        Value::Decimal(text) => {
            if is_json_number(text) {
                Ok(text.clone())
            } else {
                Err(TranscodeError::InvalidLiteral {
                    path: path.clone(),
                    text: text.clone(),
                })
            }
        }
        Value::Temporal(text) | Value::Text(text) => Ok(quote(text)),
        Value::Opaque(opaque) => Err(TranscodeError::UnrecognizedValueKind {
            path: path.clone(),
            kind: opaque.kind.clone(),
        }),
        Value::SubTree(_) | Value::Array(_) => Err(TranscodeError::TypeMismatch {
            path: path.clone(),
            expected: "scalar",
            found: value.kind_name(),
        }),
    }
}

/// Parses an external literal into a stored value of the declared kind.
///
/// Only the literal syntax is stripped. The inner text of decimals and
/// temporals is stored exactly as written. `null` is accepted for every
/// kind.
///
/// ```
/// use fhirstore_pointer::FieldPath;
/// use fhirstore_transcode::{scalar::encode_literal, ScalarKind, Value};
///
/// let path = FieldPath::root();
/// let v = encode_literal("1.50", ScalarKind::Decimal, &path).unwrap();
/// assert_eq!(v, Value::decimal("1.50"));
/// let v = encode_literal("\"2020\"", ScalarKind::Temporal, &path).unwrap();
/// assert_eq!(v, Value::temporal("2020"));
/// ```
pub fn encode_literal(literal: &str, kind: ScalarKind, path: &FieldPath) -> Result<Value> {
    let invalid = || TranscodeError::InvalidLiteral {
        path: path.clone(),
        text: literal.to_string(),
    };
    let literal_trimmed = literal.trim();
    if literal_trimmed == "null" {
        return Ok(Value::Null);
    }
    match kind {
        ScalarKind::Boolean => match literal_trimmed {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        ScalarKind::Integer => {
            if !is_json_number(literal_trimmed) {
                return Err(invalid());
            }
            literal_trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| invalid())
        }
        ScalarKind::Float => {
            if !is_json_number(literal_trimmed) {
                return Err(invalid());
            }
            literal_trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float)
                .ok_or_else(invalid)
        }
        ScalarKind::Decimal => {
            if is_json_number(literal_trimmed) {
                Ok(Value::Decimal(literal_trimmed.to_string()))
            } else {
                Err(invalid())
            }
        }
        ScalarKind::Temporal => unquote(literal_trimmed)
            .map(Value::Temporal)
            .ok_or_else(invalid),
        ScalarKind::Text => unquote(literal_trimmed)
            .map(Value::Text)
            .ok_or_else(invalid),
    }
}

/// Formats a float the way the external syntax expects; `None` for
/// non-finite values, which have no external literal.
pub fn format_float(n: f64) -> Option<String> {
    if !n.is_finite() {
        return None;
    }
    // `-0.0` keeps its sign through `{n}`.
    if n.fract() == 0.0 && n.abs() < 1e15 && !(n == 0.0 && n.is_sign_negative()) {
        Some(format!("{}", n as i64))
    } else {
        Some(format!("{n}"))
    }
}

/// Checks `text` against the JSON number grammar.
pub fn is_json_number(text: &str) -> bool {
    let data = text.as_bytes();
    let len = data.len();
    let mut x = 0;
    if x < len && data[x] == b'-' {
        x += 1;
    }
    if x >= len {
        return false;
    }
    if data[x] == b'0' {
        x += 1;
    } else if data[x].is_ascii_digit() {
        while x < len && data[x].is_ascii_digit() {
            x += 1;
        }
    } else {
        return false;
    }
    if x < len && data[x] == b'.' {
        x += 1;
        let start = x;
        while x < len && data[x].is_ascii_digit() {
            x += 1;
        }
        if x == start {
            return false;
        }
    }
    if x < len && (data[x] == b'e' || data[x] == b'E') {
        x += 1;
        if x < len && (data[x] == b'+' || data[x] == b'-') {
            x += 1;
        }
        let start = x;
        while x < len && data[x].is_ascii_digit() {
            x += 1;
        }
        if x == start {
            return false;
        }
    }
    x == len
}

/// Writes `s` as a JSON string literal.
pub(crate) fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn unquote(literal: &str) -> Option<String> {
    if !literal.starts_with('"') {
        return None;
    }
    serde_json::from_str::<String>(literal).ok()
}

/// Recognizes a sidecar sub-tree and returns the literal it carries.
///
/// The first `__strNum` or `__strDate` entry wins; the indexable companions
/// next to it are ignored.
pub fn sidecar_literal(fields: &[(String, Value)], path: &FieldPath) -> Result<Option<Value>> {
    for (key, value) in fields {
        let wrap: fn(String) -> Value = match key.as_str() {
            STR_NUM => Value::Decimal,
            STR_DATE => Value::Temporal,
            _ => continue,
        };
        return match value {
            Value::Text(text) => Ok(Some(wrap(text.clone()))),
            other => Err(TranscodeError::TypeMismatch {
                path: path.key(key.as_str()),
                expected: "text",
                found: other.kind_name(),
            }),
        };
    }
    Ok(None)
}

/// Returns true for keys owned by the sidecar layout.
pub fn is_sidecar_key(key: &str) -> bool {
    key == STR_NUM || key == STR_DATE
}

/// Builds the sidecar sub-tree for a decimal.
///
/// `__num` is left out when the text lies outside the `f64` range; the
/// verbatim `__strNum` is always written.
pub fn sidecar_decimal(text: &str, path: &FieldPath) -> Result<Value> {
    if !is_json_number(text) {
        return Err(TranscodeError::InvalidLiteral {
            path: path.clone(),
            text: text.to_string(),
        });
    }
    let mut fields: Fields = Vec::with_capacity(2);
    if let Some(num) = text.parse::<f64>().ok().filter(|f| f.is_finite()) {
        fields.push((NUM.to_string(), Value::Float(num)));
    }
    fields.push((STR_NUM.to_string(), Value::Text(text.to_string())));
    Ok(Value::SubTree(fields))
}

/// Builds the sidecar sub-tree for a temporal value.
pub fn sidecar_temporal(text: &str) -> Value {
    Value::SubTree(vec![(STR_DATE.to_string(), Value::Text(text.to_string()))])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> FieldPath {
        FieldPath::root()
    }

    #[test]
    fn test_decimal_text_is_verbatim() {
        for text in ["1.50", "0.0", "-3.000", "1e-3", "1E+10", "100"] {
            assert_eq!(render_literal(&Value::decimal(text), &root()).unwrap(), text);
        }
    }

    #[test]
    fn test_temporal_text_is_verbatim() {
        for text in ["2020", "2020-01", "2020-01-01T00:00:00.000+10:00"] {
            let rendered = render_literal(&Value::temporal(text), &root()).unwrap();
            assert_eq!(rendered, format!("\"{text}\""));
        }
    }

    #[test]
    fn test_text_is_escaped() {
        let rendered = render_literal(&Value::text("a\"b\\c\n"), &root()).unwrap();
        assert_eq!(rendered, r#""a\"b\\c\n""#);
    }

    #[test]
    fn test_render_numbers_and_bools() {
        assert_eq!(render_literal(&Value::Integer(-7), &root()).unwrap(), "-7");
        assert_eq!(render_literal(&Value::Float(2.0), &root()).unwrap(), "2");
        assert_eq!(render_literal(&Value::Float(0.25), &root()).unwrap(), "0.25");
        assert_eq!(render_literal(&Value::Bool(true), &root()).unwrap(), "true");
        assert_eq!(render_literal(&Value::Null, &root()).unwrap(), "null");
    }

    #[test]
    fn test_render_rejects_non_finite_and_bad_decimal() {
        assert!(matches!(
            render_literal(&Value::Float(f64::NAN), &root()),
            Err(TranscodeError::InvalidLiteral { .. })
        ));
        assert!(matches!(
            render_literal(&Value::decimal("1."), &root()),
            Err(TranscodeError::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn test_render_opaque_is_unrecognized() {
        let opaque = Value::Opaque(crate::value::OpaqueValue {
            kind: "binary".into(),
            data: vec![1, 2],
        });
        let err = render_literal(&opaque, &root().key("photo")).unwrap_err();
        assert_eq!(
            err,
            TranscodeError::UnrecognizedValueKind {
                path: root().key("photo"),
                kind: "binary".into()
            }
        );
    }

    #[test]
    fn test_encode_literal_kinds() {
        let p = root();
        assert_eq!(encode_literal("true", ScalarKind::Boolean, &p).unwrap(), Value::Bool(true));
        assert_eq!(encode_literal("42", ScalarKind::Integer, &p).unwrap(), Value::Integer(42));
        assert_eq!(encode_literal("0.5", ScalarKind::Float, &p).unwrap(), Value::Float(0.5));
        assert_eq!(
            encode_literal("1.50", ScalarKind::Decimal, &p).unwrap(),
            Value::decimal("1.50")
        );
        assert_eq!(
            encode_literal("\"a\\nb\"", ScalarKind::Text, &p).unwrap(),
            Value::text("a\nb")
        );
        assert_eq!(encode_literal("null", ScalarKind::Temporal, &p).unwrap(), Value::Null);
    }

    #[test]
    fn test_encode_literal_rejects_wrong_syntax() {
        let p = root().key("birthDate");
        let err = encode_literal("2020", ScalarKind::Temporal, &p).unwrap_err();
        assert_eq!(
            err,
            TranscodeError::InvalidLiteral {
                path: p.clone(),
                text: "2020".into()
            }
        );
        assert!(encode_literal("1.2.3", ScalarKind::Decimal, &p).is_err());
        assert!(encode_literal("yes", ScalarKind::Boolean, &p).is_err());
    }

    #[test]
    fn test_is_json_number() {
        for ok in ["0", "-0", "1", "10", "1.5", "-1.50", "1e5", "1E-5", "0.1e+2"] {
            assert!(is_json_number(ok), "{ok}");
        }
        for bad in ["", "-", "01", "1.", ".5", "1e", "+1", "NaN", "1.5x", " 1"] {
            assert!(!is_json_number(bad), "{bad}");
        }
    }

    #[test]
    fn test_sidecar_literal() {
        let fields: Fields = vec![
            (NUM.into(), Value::Float(1.5)),
            (STR_NUM.into(), Value::text("1.50")),
        ];
        assert_eq!(
            sidecar_literal(&fields, &root()).unwrap(),
            Some(Value::decimal("1.50"))
        );

        let fields: Fields = vec![(STR_DATE.into(), Value::text("2020"))];
        assert_eq!(
            sidecar_literal(&fields, &root()).unwrap(),
            Some(Value::temporal("2020"))
        );

        let fields: Fields = vec![("value".into(), Value::Integer(1))];
        assert_eq!(sidecar_literal(&fields, &root()).unwrap(), None);
    }

    #[test]
    fn test_sidecar_literal_requires_text() {
        let fields: Fields = vec![(STR_NUM.into(), Value::Float(1.5))];
        let err = sidecar_literal(&fields, &root().key("value")).unwrap_err();
        assert_eq!(
            err,
            TranscodeError::TypeMismatch {
                path: root().key("value").key(STR_NUM),
                expected: "text",
                found: "float"
            }
        );
    }

    #[test]
    fn test_sidecar_builders() {
        assert_eq!(
            sidecar_decimal("1.50", &root()).unwrap(),
            Value::sub_tree([(NUM, Value::Float(1.5)), (STR_NUM, Value::text("1.50"))])
        );
        assert_eq!(
            sidecar_temporal("2020"),
            Value::sub_tree([(STR_DATE, Value::text("2020"))])
        );
        assert!(sidecar_decimal("1,5", &root()).is_err());
    }

    #[test]
    fn test_sidecar_decimal_out_of_float_range() {
        for text in ["1e400", "-1e400"] {
            assert_eq!(
                sidecar_decimal(text, &root()).unwrap(),
                Value::sub_tree([(STR_NUM, Value::text(text))])
            );
        }
        let stored = sidecar_decimal("1e400", &root()).unwrap();
        let fields = stored.as_sub_tree().unwrap();
        assert_eq!(
            sidecar_literal(fields, &root()).unwrap(),
            Some(Value::decimal("1e400"))
        );
    }

    #[test]
    fn test_format_float_negative_zero() {
        assert_eq!(format_float(-0.0).as_deref(), Some("-0"));
        assert_eq!(format_float(0.0).as_deref(), Some("0"));
        assert_eq!(format_float(-3.0).as_deref(), Some("-3"));
    }
}
