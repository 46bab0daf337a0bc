//! Flattening OTLP `AnyValue`s into JSON-native values and their stringified
//! form, used for attribute summaries and attribute-predicate matching
//! (§4.6, §9 "dynamic typing of OTLP attribute values").

use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
use serde_json::{Map, Value as Json};

/// Flatten a single OTLP key/value list into a JSON object.
///
/// Scalars map to their natural JSON representation; arrays and key-value
/// lists become nested JSON structures. The union type itself is never
/// exposed to tool consumers, per §9.
pub fn attributes_to_json(attrs: &[KeyValue]) -> Map<String, Json> {
    let mut out = Map::with_capacity(attrs.len());
    for kv in attrs {
        if let Some(v) = &kv.value {
            out.insert(kv.key.clone(), any_value_to_json(v));
        }
    }
    out
}

fn any_value_to_json(value: &AnyValue) -> Json {
    match &value.value {
        Some(any_value::Value::StringValue(s)) => Json::String(s.clone()),
        Some(any_value::Value::BoolValue(b)) => Json::Bool(*b),
        Some(any_value::Value::IntValue(i)) => Json::Number((*i).into()),
        Some(any_value::Value::DoubleValue(d)) => {
            serde_json::Number::from_f64(*d).map(Json::Number).unwrap_or(Json::Null)
        }
        Some(any_value::Value::ArrayValue(arr)) => {
            Json::Array(arr.values.iter().map(any_value_to_json).collect())
        }
        Some(any_value::Value::KvlistValue(kvs)) => {
            Json::Object(attributes_to_json(&kvs.values))
        }
        Some(any_value::Value::BytesValue(b)) => Json::String(hex::encode(b)),
        None => Json::Null,
    }
}

/// Stringify a single attribute value the way the query engine's
/// `attribute_equals` predicate compares it: scalars convert to their
/// natural string form; composites (arrays, kv-lists) never equal a scalar
/// query string, so they stringify to a value no legitimate query string can
/// match by construction (we return `None`, and the caller treats a missing
/// stringification as "never matches").
pub fn any_value_to_query_string(value: &AnyValue) -> Option<String> {
    match &value.value {
        Some(any_value::Value::StringValue(s)) => Some(s.clone()),
        Some(any_value::Value::BoolValue(b)) => Some(b.to_string()),
        Some(any_value::Value::IntValue(i)) => Some(i.to_string()),
        Some(any_value::Value::DoubleValue(d)) => Some(format_shortest_roundtrip(*d)),
        Some(any_value::Value::BytesValue(b)) => Some(hex::encode(b)),
        Some(any_value::Value::ArrayValue(_)) | Some(any_value::Value::KvlistValue(_)) => None,
        None => None,
    }
}

/// Shortest decimal string that round-trips back to `d` (matches spec.md
/// §4.6's "shortest round-trip for doubles").
fn format_shortest_roundtrip(d: f64) -> String {
    let mut buf = ryu_like_shortest(d);
    if buf.ends_with(".0") {
        buf.truncate(buf.len() - 2);
    }
    buf
}

/// A small shortest-roundtrip formatter good enough for attribute
/// stringification without pulling in a dedicated `ryu` dependency: Rust's
/// `{}` Display for `f64` already produces the shortest string that parses
/// back to the same value.
fn ryu_like_shortest(d: f64) -> String {
    format!("{d}")
}

/// Look up a single attribute's query-comparable string form by key.
pub fn find_attribute_string<'a>(attrs: &'a [KeyValue], key: &str) -> Option<String> {
    attrs
        .iter()
        .find(|kv| kv.key == key)
        .and_then(|kv| kv.value.as_ref())
        .and_then(any_value_to_query_string)
}

pub fn has_attribute(attrs: &[KeyValue], key: &str) -> bool {
    attrs.iter().any(|kv| kv.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::any_value::Value;

    fn kv(key: &str, value: Value) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: Some(AnyValue { value: Some(value) }),
        }
    }

    #[test]
    fn scalars_stringify_naturally() {
        assert_eq!(
            find_attribute_string(&[kv("b", Value::BoolValue(true))], "b"),
            Some("true".to_string())
        );
        assert_eq!(
            find_attribute_string(&[kv("n", Value::IntValue(500))], "n"),
            Some("500".to_string())
        );
        assert_eq!(
            find_attribute_string(&[kv("s", Value::StringValue("hi".into()))], "s"),
            Some("hi".to_string())
        );
    }

    #[test]
    fn composites_never_stringify() {
        let arr = kv(
            "arr",
            Value::ArrayValue(opentelemetry_proto::tonic::common::v1::ArrayValue {
                values: vec![AnyValue {
                    value: Some(Value::IntValue(1)),
                }],
            }),
        );
        assert_eq!(find_attribute_string(&[arr], "arr"), None);
    }

    #[test]
    fn has_attribute_checks_key_presence_only() {
        let attrs = [kv("http.status_code", Value::IntValue(500))];
        assert!(has_attribute(&attrs, "http.status_code"));
        assert!(!has_attribute(&attrs, "missing"));
    }
}
