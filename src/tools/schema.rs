//! Argument validation against a tool's JSON schema.
//!
//! Covers the subset of JSON Schema the built-in tools use: required
//! properties, primitive `type` checks, `enum`, and `minimum` for numbers.

use super::ToolError;
use serde_json::Value;

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check `args` against `schema`.
///
/// Optional properties given as `null` are treated as absent.
pub fn validate_arguments(schema: &Value, args: &Value) -> Result<(), ToolError> {
    let args = args
        .as_object()
        .ok_or_else(|| ToolError::SchemaViolation("arguments must be an object".to_string()))?;

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    for field in &required {
        match args.get(*field) {
            None | Some(Value::Null) => {
                return Err(ToolError::SchemaViolation(format!(
                    "missing required parameter: {}",
                    field
                )))
            }
            Some(_) => {}
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (name, prop_schema) in properties {
        let Some(value) = args.get(name).filter(|v| !v.is_null()) else {
            continue;
        };

        if let Some(expected) = prop_schema.get("type").and_then(Value::as_str) {
            let type_ok = match expected {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !type_ok {
                return Err(ToolError::SchemaViolation(format!(
                    "parameter '{}' must be of type '{}', got {}",
                    name,
                    expected,
                    json_type_name(value)
                )));
            }
        }

        if let Some(allowed) = prop_schema.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                let allowed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                return Err(ToolError::SchemaViolation(format!(
                    "parameter '{}' must be one of [{}], got {}",
                    name,
                    allowed.join(", "),
                    value
                )));
            }
        }

        if let (Some(minimum), Some(actual)) = (
            prop_schema.get("minimum").and_then(Value::as_f64),
            value.as_f64(),
        ) {
            if actual < minimum {
                return Err(ToolError::SchemaViolation(format!(
                    "parameter '{}' must be at least {}, got {}",
                    name, minimum, value
                )));
            }
        }
    }

    Ok(())
}
