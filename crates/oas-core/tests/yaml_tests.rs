use oas_core::convert::{json_to_yaml, yaml_to_json, yaml_to_json_indent};
use oas_core::error::FormatError;
use proptest::prelude::*;
use serde_json::{Value, json};

#[test]
fn yaml_keys_are_coerced_to_strings() {
    let yaml = b"200: ok\n1.5: float\ntrue: yes\n~: nothing\nname: plain\n";
    let json: Value = serde_json::from_slice(&yaml_to_json(yaml).unwrap()).unwrap();
    assert_eq!(
        json,
        json!({"200": "ok", "1.5": "float", "true": "yes", "null": "nothing", "name": "plain"})
    );
    let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, ["200", "1.5", "true", "null", "name"]);
}

#[test]
fn composite_keys_are_rejected() {
    let err = yaml_to_json(b"? [a, b]\n: value\n").unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedKey(_)));
}

#[test]
fn indented_output_is_multiline() {
    let out = yaml_to_json_indent(b"a:\n  b: 1\n").unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains('\n'));
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value, json!({"a": {"b": 1}}));
}

#[test]
fn json_to_yaml_keeps_key_order() {
    let yaml = json_to_yaml(br#"{"zeta": 1, "alpha": {"nested": [1, "two"]}}"#).unwrap();
    let text = String::from_utf8(yaml).unwrap();
    let zeta = text.find("zeta").unwrap();
    let alpha = text.find("alpha").unwrap();
    assert!(zeta < alpha);
}

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 _.-]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn json_yaml_json_round_trip(value in json_value()) {
        let json = serde_json::to_vec(&value).unwrap();
        let yaml = json_to_yaml(&json).unwrap();
        let back: Value = serde_json::from_slice(&yaml_to_json(&yaml).unwrap()).unwrap();
        prop_assert_eq!(back, value);
    }
}
