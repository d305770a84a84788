//! Canonical JSON rendering used for row identity
//!
//! Object keys are sorted at every level and no whitespace is emitted, so two
//! structurally equal payloads always render to the same string regardless of
//! the key order they were ingested with.

use serde_json::Value;

/// Render `value` in canonical form
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_key(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        },
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_key(key: &str, out: &mut String) {
    out.push_str(&Value::String(key.to_string()).to_string());
}
