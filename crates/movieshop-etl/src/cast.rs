//! Field access and lenient casts over raw JSON records
//!
//! Raw movie records are untyped. Field names are resolved case-insensitively
//! (`genres.id` finds `Id`), and casts never fail: a value that cannot be
//! represented in the target type becomes `None`, the same way a dataframe
//! engine turns a bad cast into a null.

use serde_json::Value;

/// Look up a field of a JSON object, ignoring ASCII case. An exact match wins.
pub fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    let object = value.as_object()?;
    object.get(name).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

/// Resolve a dotted path such as `Movies.Id`
pub fn path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| field(current, segment))
}

/// Cast to a 32-bit integer, truncating fractional values toward zero
pub fn to_int(value: Option<&Value>) -> Option<i32> {
    let wide = match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        },
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }?;
    i32::try_from(wide).ok()
}

/// Cast to a finite double
pub fn to_f64(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Cast to a string; nested values are rendered as compact JSON
pub fn to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn truncate(f: f64) -> Option<i64> {
    // i64::MAX is not exactly representable; stay strictly inside the range
    (f.is_finite() && f.abs() < 9.2e18).then(|| f.trunc() as i64)
}
