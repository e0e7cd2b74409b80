//! Cleanup and decoding of semi-structured JSON produced by the completion provider.

use std::sync::OnceLock;

use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum JsonDecodeError {
    #[error("malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("unexpected JSON shape: {0}")]
    Shape(#[source] serde_json::Error),
    #[error("decoded JSON was null")]
    Null,
}

const FENCE: &str = "```";

/// Strip a surrounding markdown code fence, if any.
///
/// Everything up to the first newline (the fence plus its language tag) is
/// dropped, then the text is cut at the last fence marker.
pub fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    if !t.starts_with(FENCE) {
        return t;
    }
    let inner = match t.find('\n') {
        Some(nl) if nl > 0 => &t[nl + 1..],
        _ => t,
    };
    match inner.rfind(FENCE) {
        Some(end) if end > 0 => inner[..end].trim(),
        _ => inner,
    }
}

fn stray_control_chars() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\x00-\x08\x0B-\x0C\x0E-\x1F]").ok())
        .as_ref()
}

/// Remove control characters other than tab, newline and carriage return.
pub fn strip_control_chars(text: &str) -> String {
    let filtered: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();
    match stray_control_chars() {
        Some(re) => re.replace_all(&filtered, "").into_owned(),
        None => filtered,
    }
}

/// Fence stripping followed by control-character removal.
pub fn sanitize(raw: &str) -> String {
    strip_control_chars(strip_fences(raw))
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.to_lowercase(), lowercase_keys(v));
            }
            Value::Object(out)
        },
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Parse `text` into `T`, matching object keys without regard to case.
///
/// Target field names must be lowercase (`snake_case` is fine).
pub fn decode_case_insensitive<T: DeserializeOwned>(text: &str) -> Result<T, JsonDecodeError> {
    let value: Value = serde_json::from_str(text).map_err(JsonDecodeError::Malformed)?;
    if value.is_null() {
        return Err(JsonDecodeError::Null);
    }
    serde_json::from_value(lowercase_keys(value)).map_err(JsonDecodeError::Shape)
}

/// Accepts an integer id, a numeric string, an empty string or null.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accepts an integer or a numeric string; anything else becomes 0.
pub fn lenient_score<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
