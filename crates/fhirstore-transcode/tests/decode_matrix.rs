use std::sync::Arc;

use fhirstore_transcode::{
    decode, encode, CollectingSink, Diagnostic, DocumentTree, ExtensionDefect, ExternalRecord,
    FieldPath, TranscodeError, Transcoder, Value,
};

fn tree(fields: Vec<(&str, Value)>) -> DocumentTree {
    fields.into_iter().collect()
}

fn record(fields: Vec<(&str, Value)>) -> ExternalRecord {
    fields.into_iter().collect()
}

#[test]
fn decimal_and_temporal_text_survive_unchanged() {
    let stored = tree(vec![
        ("valueDecimal", Value::decimal("1.50")),
        ("effectiveDateTime", Value::temporal("2020")),
        ("issued", Value::temporal("2020-01-02T03:04:05.000+01:00")),
    ]);
    let decoded = decode(&stored).unwrap();
    assert_eq!(decoded.record.get("valueDecimal"), Some(&Value::decimal("1.50")));
    assert_eq!(decoded.record.get("effectiveDateTime"), Some(&Value::temporal("2020")));
    assert_eq!(
        decoded.record.get("issued"),
        Some(&Value::temporal("2020-01-02T03:04:05.000+01:00"))
    );
    assert_eq!(encode(&decoded.record).unwrap(), stored);
}

#[test]
fn extension_rekeying_matrix() {
    let stored = tree(vec![
        (
            "extension",
            Value::Array(vec![
                Value::sub_tree([(
                    "http://example.org/a",
                    Value::sub_tree([("valueString", Value::text("x"))]),
                )]),
                Value::sub_tree([("http://example.org/b", Value::SubTree(vec![]))]),
            ]),
        ),
        ("modifierExtension", Value::Array(vec![])),
    ]);
    let decoded = decode(&stored).unwrap();
    assert_eq!(
        decoded.record,
        record(vec![
            (
                "extension",
                Value::Array(vec![
                    Value::sub_tree([
                        ("url", Value::text("http://example.org/a")),
                        ("valueString", Value::text("x")),
                    ]),
                    Value::sub_tree([("url", Value::text("http://example.org/b"))]),
                ]),
            ),
            ("modifierExtension", Value::Array(vec![])),
        ])
    );
    assert_eq!(encode(&decoded.record).unwrap(), stored);
}

#[test]
fn extension_url_position_does_not_matter_on_encode() {
    let external = record(vec![(
        "extension",
        Value::Array(vec![Value::sub_tree([
            ("valueBoolean", Value::Bool(true)),
            ("url", Value::text("http://example.org/flag")),
        ])]),
    )]);
    let stored = encode(&external).unwrap();
    let decoded = decode(&stored).unwrap();
    assert_eq!(
        decoded.record,
        record(vec![(
            "extension",
            Value::Array(vec![Value::sub_tree([
                ("url", Value::text("http://example.org/flag")),
                ("valueBoolean", Value::Bool(true)),
            ])]),
        )])
    );
}

#[test]
fn malformed_extension_entry_counts() {
    for count in [0usize, 2] {
        let element: Vec<(&str, Value)> = [
            ("http://a", Value::SubTree(vec![])),
            ("http://b", Value::SubTree(vec![])),
        ]
        .into_iter()
        .take(count)
        .collect();
        let stored = tree(vec![(
            "extension",
            Value::Array(vec![Value::sub_tree(element)]),
        )]);
        assert_eq!(
            decode(&stored).unwrap_err(),
            TranscodeError::MalformedExtension {
                path: FieldPath::root().key("extension").index(0),
                defect: ExtensionDefect::EntryCount(count),
            }
        );
    }
}

#[test]
fn malformed_external_extension_defects() {
    let cases = [
        (Value::sub_tree([("valueCode", Value::text("x"))]), ExtensionDefect::MissingUrl),
        (
            Value::sub_tree([("url", Value::text("a")), ("url", Value::text("b"))]),
            ExtensionDefect::DuplicateUrl,
        ),
        (Value::sub_tree([("url", Value::Integer(1))]), ExtensionDefect::UrlNotText),
    ];
    for (element, defect) in cases {
        let external = record(vec![("extension", Value::Array(vec![element]))]);
        match encode(&external).unwrap_err() {
            TranscodeError::MalformedExtension { defect: found, .. } => assert_eq!(found, defect),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

#[test]
fn extension_field_must_be_an_array() {
    let stored = tree(vec![("extension", Value::text("oops"))]);
    assert_eq!(
        decode(&stored).unwrap_err(),
        TranscodeError::TypeMismatch {
            path: FieldPath::root().key("extension"),
            expected: "array",
            found: Value::text("").kind_name(),
        }
    );
}

#[test]
fn legacy_time_precision_collapses() {
    let stored = tree(vec![(
        "effectiveDateTime",
        Value::sub_tree([
            ("time", Value::temporal("2015-02-07T13:28:17-05:00")),
            ("precision", Value::text("timestamp")),
        ]),
    )]);
    let sink = Arc::new(CollectingSink::new());
    let decoded = Transcoder::new().with_sink(sink.clone()).decode(&stored).unwrap();
    assert_eq!(
        decoded.record.get("effectiveDateTime"),
        Some(&Value::temporal("2015-02-07T13:28:17-05:00"))
    );
    assert_eq!(
        sink.take(),
        vec![Diagnostic::LegacyTemporalShim {
            path: FieldPath::root().key("effectiveDateTime")
        }]
    );
}

#[test]
fn legacy_shape_with_extra_field_stays_an_object() {
    let sub_tree = Value::sub_tree([
        ("time", Value::temporal("2015-02-07T13:28:17-05:00")),
        ("precision", Value::text("timestamp")),
        ("note", Value::text("kept")),
    ]);
    let stored = tree(vec![("period", sub_tree.clone())]);
    let decoded = decode(&stored).unwrap();
    assert_eq!(decoded.record.get("period"), Some(&sub_tree));
}

#[test]
fn legacy_shape_with_wrong_kinds_stays_an_object() {
    let sub_tree = Value::sub_tree([
        ("time", Value::text("2015")),
        ("precision", Value::text("year")),
    ]);
    let stored = tree(vec![("period", sub_tree.clone())]);
    assert_eq!(decode(&stored).unwrap().record.get("period"), Some(&sub_tree));
}

#[test]
fn legacy_shape_with_empty_precision_stays_an_object() {
    let sub_tree = Value::sub_tree([
        ("time", Value::temporal("2020-01-01T00:00:00Z")),
        ("precision", Value::text("")),
    ]);
    let stored = tree(vec![("effective", sub_tree.clone())]);
    let decoded = decode(&stored).unwrap();
    assert_eq!(decoded.record.get("effective"), Some(&sub_tree));
    assert_eq!(encode(&decoded.record).unwrap(), stored);
}

#[test]
fn sidecar_literals_collapse_on_decode() {
    let stored = tree(vec![
        (
            "valueQuantity",
            Value::sub_tree([(
                "value",
                Value::sub_tree([
                    ("__num", Value::Float(1.5)),
                    ("__strNum", Value::text("1.50")),
                ]),
            )]),
        ),
        ("birthDate", Value::sub_tree([("__strDate", Value::text("1970-01"))])),
    ]);
    let decoded = decode(&stored).unwrap();
    assert_eq!(
        decoded.record,
        record(vec![
            ("valueQuantity", Value::sub_tree([("value", Value::decimal("1.50"))])),
            ("birthDate", Value::temporal("1970-01")),
        ])
    );
}

#[test]
fn sidecar_literal_must_be_text() {
    let stored = tree(vec![("value", Value::sub_tree([("__strNum", Value::Float(1.5))]))]);
    assert_eq!(
        decode(&stored).unwrap_err().path(),
        Some(&FieldPath::root().key("value").key("__strNum"))
    );
}

#[test]
fn encoded_external_only_keys_are_refused() {
    let external = record(vec![(
        "subject",
        Value::sub_tree([
            ("reference", Value::text("Patient/1")),
            ("reference__id", Value::text("1")),
        ]),
    )]);
    assert_eq!(
        encode(&external).unwrap_err().path(),
        Some(&FieldPath::root().key("subject").key("reference__id"))
    );
}
