//! Tool trait and argument helpers

use super::error::{Result, ToolError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Grouping used for agent card skills and `tools` listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Example,
    Math,
    Time,
    Text,
    Conversion,
    Api,
    File,
}

impl ToolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Example => "example",
            ToolCategory::Math => "math",
            ToolCategory::Time => "time",
            ToolCategory::Text => "text",
            ToolCategory::Conversion => "conversion",
            ToolCategory::Api => "api",
            ToolCategory::File => "file",
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a tool call. Soft failures (a bad expression, a missing file)
/// come back as `success: false` rather than `Err`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: Value,
}

impl ToolResult {
    pub fn success(output: impl Into<Value>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    /// A soft failure carrying structured details.
    pub fn failure(output: Value) -> Self {
        Self {
            success: false,
            output,
        }
    }

    /// Plain string output as-is, anything else as pretty JSON.
    pub fn to_text(&self) -> String {
        match &self.output {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn category(&self) -> ToolCategory;

    /// Example requests, surfaced on the agent card.
    fn examples(&self) -> Vec<String> {
        Vec::new()
    }

    /// JSON schema of the input object.
    fn input_schema(&self) -> Value;

    async fn execute(&self, input: Value) -> Result<ToolResult>;
}

pub(crate) fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidInput(format!("'{key}' is required")))
}

pub(crate) fn optional_str<'a>(input: &'a Value, key: &str, default: &'a str) -> &'a str {
    input.get(key).and_then(Value::as_str).unwrap_or(default)
}

pub(crate) fn required_i64(input: &Value, key: &str) -> Result<i64> {
    input
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ToolError::InvalidInput(format!("'{key}' must be an integer")))
}

pub(crate) fn optional_i64(input: &Value, key: &str, default: i64) -> Result<i64> {
    match input.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v
            .as_i64()
            .ok_or_else(|| ToolError::InvalidInput(format!("'{key}' must be an integer"))),
    }
}

pub(crate) fn required_f64(input: &Value, key: &str) -> Result<f64> {
    input
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolError::InvalidInput(format!("'{key}' must be a number")))
}

pub(crate) fn optional_bool(input: &Value, key: &str, default: bool) -> bool {
    input.get(key).and_then(Value::as_bool).unwrap_or(default)
}
