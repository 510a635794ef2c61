// ABOUTME: Presence-checked accessors for untyped JSON documents of site-controlled shape.
// ABOUTME: Every lookup returns Option so strategies fall through instead of failing on absent fields.

use serde_json::{Map, Value};

/// Non-empty, trimmed string at a JSON pointer.
pub fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// First non-empty string among several pointers.
pub fn first_str<'a>(value: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers.iter().find_map(|p| str_at(value, p))
}

/// Non-negative integer at a JSON pointer; numeric strings and floats are accepted.
pub fn u64_at(value: &Value, pointer: &str) -> Option<u64> {
    as_u64_lenient(value.pointer(pointer)?)
}

pub fn as_u64_lenient(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64))
        }
        _ => None,
    }
}

/// Array at a JSON pointer, or an empty slice.
pub fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Returns true if a JSON-LD `@type` value names `expected` (string or array form).
pub fn matches_type(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s.eq_ignore_ascii_case(expected),
        Value::Array(arr) => arr.iter().any(|v| matches_type(v, expected)),
        _ => false,
    }
}

/// Depth-first search for the first object accepted by `pred`.
pub fn find_object<'a>(value: &'a Value, pred: &dyn Fn(&Map<String, Value>) -> bool) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if pred(map) {
                return Some(value);
            }
            map.values().find_map(|v| find_object(v, pred))
        }
        Value::Array(arr) => arr.iter().find_map(|v| find_object(v, pred)),
        _ => None,
    }
}

/// A URL-ish field that may be a string, an array of strings, or an object with `url`.
pub fn url_like(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()),
        Value::Array(arr) => arr.iter().find_map(url_like),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(url_like),
        _ => None,
    }
}
