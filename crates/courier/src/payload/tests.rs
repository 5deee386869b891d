//! Unit tests for payload normalisation.

use rstest::rstest;
use serde::Deserialize;
use serde::de::value::{Error as ValueError, MapDeserializer};
use serde_json::json;

use super::*;

fn mapping(entries: &[(&str, NormalizedValue)]) -> NormalizedValue {
    NormalizedValue::Mapping(
        entries
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect(),
    )
}

#[test]
fn normalises_flat_object() {
    let value = json!({"player": "Alice", "amount": 5});
    let expected = mapping(&[
        ("player", NormalizedValue::from("Alice")),
        ("amount", NormalizedValue::from(5_i64)),
    ]);
    assert_eq!(normalize(&value), expected);
}

#[test]
fn preserves_nested_structure_and_sequence_order() {
    let value = json!({
        "team": {
            "name": "red",
            "members": ["Alice", "Bob", {"name": "Carol", "ready": true}],
        },
        "round": 3,
        "ratio": 0.5,
        "note": null,
    });

    let normalised = normalize(&value);
    let team = normalised.get("team").expect("team field");
    let members = team
        .get("members")
        .and_then(NormalizedValue::as_sequence)
        .expect("members sequence");

    assert_eq!(members.len(), 3);
    assert_eq!(members.first().and_then(NormalizedValue::as_str), Some("Alice"));
    assert_eq!(members.get(1).and_then(NormalizedValue::as_str), Some("Bob"));
    let carol = members.get(2).expect("third member");
    assert_eq!(carol.get("name").and_then(NormalizedValue::as_str), Some("Carol"));
    assert_eq!(carol.get("ready").and_then(NormalizedValue::as_bool), Some(true));
    assert_eq!(normalised.get("round").and_then(NormalizedValue::as_i64), Some(3));
    assert_eq!(normalised.get("ratio").and_then(NormalizedValue::as_f64), Some(0.5));
    assert!(normalised.get("note").is_some_and(NormalizedValue::is_null));
}

#[rstest]
#[case::null(json!(null), NormalizedValue::NULL)]
#[case::bool(json!(false), NormalizedValue::from(false))]
#[case::negative(json!(-4), NormalizedValue::from(-4_i64))]
#[case::unsigned(json!(u64::MAX), NormalizedValue::Scalar(Scalar::Unsigned(u64::MAX)))]
#[case::float(json!(1.25), NormalizedValue::from(1.25))]
#[case::text(json!("hi"), NormalizedValue::from("hi"))]
fn normalises_scalars(#[case] input: serde_json::Value, #[case] expected: NormalizedValue) {
    assert_eq!(normalize(&input), expected);
}

#[test]
fn deserialising_matches_value_normalisation() {
    let text = r#"{"a":[1,2,{"b":"c"}],"d":{"e":null,"f":18446744073709551615}}"#;
    let via_value = normalize(&serde_json::from_str(text).expect("parse value"));
    let direct: NormalizedValue = serde_json::from_str(text).expect("deserialise directly");
    assert_eq!(direct, via_value);
}

#[test]
fn skips_keys_that_are_not_strings() {
    let entries = vec![(1_u32, "one"), (2_u32, "two")];
    let deserializer: MapDeserializer<'_, _, ValueError> = MapDeserializer::new(entries.into_iter());
    let normalised = NormalizedValue::deserialize(deserializer).expect("deserialise");
    assert_eq!(normalised, NormalizedValue::Mapping(Mapping::new()));
}

#[test]
fn serialises_back_to_equivalent_json() {
    let original = json!({"player": "Alice", "scores": [1, 2, 3], "meta": {"vip": true}});
    let encoded = serde_json::to_value(normalize(&original)).expect("serialise");
    assert_eq!(encoded, original);
}

#[test]
fn accessors_reject_mismatched_shapes() {
    let text = NormalizedValue::from("5");
    assert_eq!(text.as_i64(), None);
    assert!(text.as_mapping().is_none());
    assert!(text.as_sequence().is_none());
    assert!(text.get("anything").is_none());
    assert_eq!(NormalizedValue::from(7_u64), NormalizedValue::from(7_i64));
}

#[test]
fn scalar_accessors_see_through_the_scalar_wrapper() {
    let flag = NormalizedValue::from(true);
    assert_eq!(flag.as_scalar(), Some(&Scalar::Bool(true)));
    assert_eq!(flag.as_bool(), Some(true));

    let sequence = normalize(&json!([1]));
    assert!(sequence.as_scalar().is_none());
    assert_eq!(sequence.as_bool(), None);
    assert!(!sequence.is_null());
}

#[test]
fn large_unsigned_values_convert_to_the_nearest_float() {
    let huge = NormalizedValue::Scalar(Scalar::Unsigned(u64::MAX));
    assert_eq!(huge.as_i64(), None);
    assert_eq!(huge.as_f64(), Some(18_446_744_073_709_551_616.0));
}
