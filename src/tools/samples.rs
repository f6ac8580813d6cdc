//! Placeholder tools showing the shape of a tool. Replace with real ones.

use super::error::Result;
use super::r#trait::{Tool, ToolCategory, ToolResult, optional_i64, optional_str, required_str};
use async_trait::async_trait;
use serde_json::{Value, json};

pub struct ExampleTool1;

#[async_trait]
impl Tool for ExampleTool1 {
    fn name(&self) -> &str {
        "tool_example_1"
    }

    fn description(&self) -> &str {
        "Example tool that does something"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Example
    }

    fn examples(&self) -> Vec<String> {
        vec![
            "Use tool 1 to do something".to_string(),
            "Can you run tool 1?".to_string(),
        ]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "param1": {"type": "string", "description": "First parameter"},
                "param2": {"type": "integer", "description": "Second parameter", "default": 1}
            },
            "required": ["param1"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let param1 = required_str(&input, "param1")?;
        let param2 = optional_i64(&input, "param2", 1)?;
        Ok(ToolResult::success(format!(
            "Tool 1 executed with param1='{param1}' and param2={param2}"
        )))
    }
}

pub struct ExampleTool2;

#[async_trait]
impl Tool for ExampleTool2 {
    fn name(&self) -> &str {
        "tool_example_2"
    }

    fn description(&self) -> &str {
        "Example tool that returns structured data"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Example
    }

    fn examples(&self) -> Vec<String> {
        vec![
            "Use tool 2 for something".to_string(),
            "Run tool 2 with parameters".to_string(),
        ]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "data": {"type": "string", "description": "Input data"}
            },
            "required": ["data"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let data = required_str(&input, "data")?;
        Ok(ToolResult::success(json!({
            "status": "success",
            "data": data,
            "processed": true,
        })))
    }
}

/// Stand-in for an outbound HTTP call. Reports what it would have done.
pub struct ApiCallTool;

#[async_trait]
impl Tool for ApiCallTool {
    fn name(&self) -> &str {
        "api_call"
    }

    fn description(&self) -> &str {
        "Make an API call"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Example
    }

    fn examples(&self) -> Vec<String> {
        vec!["Call the data API".to_string()]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "endpoint": {"type": "string", "description": "API endpoint URL"},
                "method": {"type": "string", "description": "HTTP method", "default": "GET"}
            },
            "required": ["endpoint"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let endpoint = required_str(&input, "endpoint")?;
        let method = optional_str(&input, "method", "GET").to_uppercase();
        Ok(ToolResult::success(format!("Would call {method} {endpoint}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_example_tool_1_defaults_param2() {
        let result = ExampleTool1
            .execute(json!({"param1": "x"}))
            .await
            .expect("result");
        assert_eq!(result.to_text(), "Tool 1 executed with param1='x' and param2=1");
    }

    #[tokio::test]
    async fn test_example_tool_1_requires_param1() {
        assert!(ExampleTool1.execute(json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_example_tool_2_echoes_data() {
        let result = ExampleTool2
            .execute(json!({"data": "sample data"}))
            .await
            .expect("result");
        assert_eq!(result.output["processed"], true);
        assert_eq!(result.output["data"], "sample data");
    }

    #[tokio::test]
    async fn test_api_call_defaults_to_get() {
        let result = ApiCallTool
            .execute(json!({"endpoint": "https://api.example.com/data"}))
            .await
            .expect("result");
        assert_eq!(result.to_text(), "Would call GET https://api.example.com/data");
    }
}
