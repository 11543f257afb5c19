//! Redaction of request bodies before they are stored

use serde_json::Value as JsonValue;

/// Placeholder written over sensitive values
pub const REDACTION_MARKER: &str = "***REDACTED***";

/// Top-level keys whose values are never stored. Matching is exact and case-sensitive.
pub const SENSITIVE_FIELDS: [&str; 5] = ["password", "token", "secret", "apiKey", "api_key"];

/// Return a copy of `body` with sensitive top-level fields redacted.
///
/// Only the top level of an object is inspected; nested objects are copied as is.
/// Fields holding a falsy value (`null`, `false`, `0`, `""`) are left alone.
/// Anything that is not an object is returned unchanged.
pub fn sanitize_body(body: &JsonValue) -> JsonValue {
    let JsonValue::Object(fields) = body else {
        return body.clone();
    };

    let mut sanitized = fields.clone();
    for field in SENSITIVE_FIELDS {
        if let Some(value) = sanitized.get_mut(field) {
            if is_truthy(value) {
                *value = JsonValue::String(REDACTION_MARKER.to_string());
            }
        }
    }

    JsonValue::Object(sanitized)
}

/// Truthiness in the loose sense the payload producers use: empty strings,
/// zero, `false` and `null` count as absent.
pub(crate) fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}
