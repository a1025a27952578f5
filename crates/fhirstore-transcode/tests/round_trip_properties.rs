//! Property-based tests for round-trip closure.

#![allow(clippy::expect_used)]

use fhirstore_transcode::{ExternalRecord, LiteralLayout, TranscodeOptions, Transcoder, Value};
use proptest::prelude::*;

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("id"),
        Just("_id"),
        Just("status"),
        Just("code"),
        Just("value"),
        Just("time"),
        Just("a"),
    ]
    .prop_map(String::from)
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        "[a-z0-9 ]{0,8}".prop_map(Value::Text),
        "(19|20)[0-9]{2}(-0[1-9](-1[0-9])?)?".prop_map(Value::Temporal),
        "-?[1-9][0-9]{0,4}\\.[0-9]{1,3}0?".prop_map(Value::Decimal),
    ]
}

/// Extension elements keep `url` first, which is where decode puts it.
fn arb_extensions(inner: BoxedStrategy<Value>) -> impl Strategy<Value = Value> {
    prop::collection::vec(
        (
            "http://example\\.org/[a-z]{1,6}",
            prop::collection::vec((arb_key(), inner), 0..3),
        )
            .prop_map(|(url, payload)| {
                let mut fields = vec![("url".to_string(), Value::Text(url))];
                fields.extend(payload);
                Value::SubTree(fields)
            }),
        0..3,
    )
    .prop_map(Value::Array)
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 48, 4, |inner| {
        let inner = inner.boxed();
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            (
                prop::collection::vec((arb_key(), inner.clone()), 0..4),
                prop::option::of(arb_extensions(inner)),
            )
                .prop_map(|(mut fields, extensions)| {
                    if let Some(ext) = extensions {
                        fields.push(("extension".to_string(), ext));
                    }
                    Value::SubTree(fields)
                }),
        ]
    })
}

fn arb_record() -> impl Strategy<Value = ExternalRecord> {
    prop::collection::vec((arb_key(), arb_value()), 0..6)
        .prop_map(ExternalRecord::from_fields)
}

fn check_closure(transcoder: &Transcoder, record: &ExternalRecord) -> Result<(), TestCaseError> {
    let stored = transcoder
        .encode(record)
        .map_err(|e| TestCaseError::fail(format!("encode failed: {e}")))?;
    let decoded = transcoder.decode(&stored).expect("decode should succeed");
    prop_assert!(decoded.side_documents.is_empty());
    prop_assert_eq!(&decoded.record, record);

    let stored_again = transcoder
        .encode(&decoded.record)
        .expect("re-encode should succeed");
    prop_assert_eq!(stored_again, stored);
    Ok(())
}

proptest! {
    #[test]
    fn native_layout_round_trip(record in arb_record()) {
        check_closure(&Transcoder::new(), &record)?;
    }

    #[test]
    fn sidecar_layout_round_trip(record in arb_record()) {
        let transcoder = Transcoder::with_options(
            TranscodeOptions::default().with_literal_layout(LiteralLayout::Sidecar),
        );
        check_closure(&transcoder, &record)?;
    }
}
