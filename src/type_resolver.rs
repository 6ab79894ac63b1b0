//! Type inference helpers.
//!
//! Maps validation-rule tokens and runtime JSON values to the OpenAPI type names
//! written into generated parameters and schemas.

use crate::rules::Rule;
use serde_json::{json, Value};

/// Rule tokens that carry a type, paired with the OpenAPI type they imply.
///
/// Order matters only for documentation; lookups go through [`rule_to_type`].
pub const RULE_TYPES: &[(&str, &str)] = &[
    ("array", "object"),
    ("boolean", "boolean"),
    ("date", "date"),
    ("digits", "integer"),
    ("integer", "integer"),
    ("numeric", "double"),
    ("string", "string"),
];

/// Type used when no rule token says otherwise.
pub const DEFAULT_TYPE: &str = "string";

/// Returns the OpenAPI type for a single rule token, if the token carries one.
pub fn rule_to_type(token: &str) -> Option<&'static str> {
    RULE_TYPES
        .iter()
        .find(|(rule, _)| *rule == token)
        .map(|(_, openapi)| *openapi)
}

/// Returns the type of the first typed rule, scanning in declaration order.
///
/// Falls back to `string` when no rule carries a type.
pub fn parameter_type(rules: &[Rule]) -> &'static str {
    rules
        .iter()
        .find_map(|rule| match rule {
            Rule::Type(kind) => rule_to_type(kind),
            _ => None,
        })
        .unwrap_or(DEFAULT_TYPE)
}

/// Returns the OpenAPI example type of a live value.
///
/// Lists map to `array`, maps to `object`. `null` reports as `string`.
pub fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) | Value::Null => "string",
    }
}

/// Returns the placeholder used in examples where the live value was `null`.
pub fn default_for_type(openapi_type: &str) -> Option<Value> {
    let value = match openapi_type {
        "object" => json!({}),
        "array" => json!([]),
        "boolean" => json!(false),
        "date" => json!("0000-00-00"),
        "integer" | "double" | "number" => json!(0),
        "string" => json!(""),
        _ => return None,
    };
    Some(value)
}
