use serde_json::Value;

use super::state::PipelineStage;
use crate::error::PipelineError;

/// JSON Schema the caller wants the backend's answer to conform to.
///
/// The backend is asked to honour the schema natively; the returned text is
/// still parsed and checked locally against the supported keyword subset:
/// `type`, `properties`, `required`, `items`, `enum` and
/// `additionalProperties: false`. Unknown keywords are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    schema: Value,
}

impl OutputSchema {
    pub fn new(schema: Value) -> Result<Self, PipelineError> {
        if !schema.is_object() {
            return Err(PipelineError::InvalidSchema {
                reason: "output schema must be a JSON object".into(),
            });
        }
        Ok(Self { schema })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, PipelineError> {
        let schema = serde_json::from_str(raw).map_err(|e| PipelineError::InvalidSchema {
            reason: format!("output schema is not valid JSON: {e}"),
        })?;
        Self::new(schema)
    }

    pub fn as_value(&self) -> &Value {
        &self.schema
    }

    /// Parse backend text produced during `stage` and check it against the schema.
    pub fn parse(&self, text: &str, stage: PipelineStage) -> Result<Value, PipelineError> {
        let body = strip_code_fence(text);
        let value: Value =
            serde_json::from_str(body).map_err(|e| PipelineError::MalformedResponse {
                stage,
                reason: format!("response is not valid JSON: {e}"),
            })?;
        self.validate(&value, stage)?;
        Ok(value)
    }

    pub fn validate(&self, value: &Value, stage: PipelineStage) -> Result<(), PipelineError> {
        check(&self.schema, value, "$")
            .map_err(|reason| PipelineError::MalformedResponse { stage, reason })
    }
}

/// Models sometimes wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn check(schema: &Value, value: &Value, path: &str) -> Result<(), String> {
    if let Some(expected) = schema.get("type") {
        let allowed: Vec<&str> = match expected {
            Value::String(t) => vec![t.as_str()],
            Value::Array(ts) => ts.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        if !allowed.is_empty() && !allowed.iter().any(|t| matches_type(t, value)) {
            return Err(format!(
                "{path}: expected {}, got {}",
                allowed.join(" or "),
                type_name(value)
            ));
        }
    }

    if let Some(Value::Array(options)) = schema.get("enum")
        && !options.contains(value)
    {
        return Err(format!("{path}: value {value} is not one of the allowed values"));
    }

    if let Value::Object(obj) = value {
        let props = schema.get("properties").and_then(Value::as_object);

        if let Some(Value::Array(required)) = schema.get("required") {
            for key in required.iter().filter_map(Value::as_str) {
                if !obj.contains_key(key) {
                    return Err(format!("{path}: missing required property '{key}'"));
                }
            }
        }

        for (key, child) in obj {
            match props.and_then(|p| p.get(key)) {
                Some(child_schema) => check(child_schema, child, &format!("{path}.{key}"))?,
                None if schema.get("additionalProperties") == Some(&Value::Bool(false)) => {
                    return Err(format!("{path}: unexpected property '{key}'"));
                }
                None => {}
            }
        }
    }

    if let (Value::Array(items), Some(item_schema)) = (value, schema.get("items")) {
        for (i, item) in items.iter().enumerate() {
            check(item_schema, item, &format!("{path}[{i}]"))?;
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
