//! Weather and search tools. Both return canned data; swap in a real API client
//! behind the same schema when one is available.

use super::error::{Result, ToolError};
use super::r#trait::{Tool, ToolCategory, ToolResult, optional_i64, required_str};
use async_trait::async_trait;
use serde_json::{Value, json};

const MAX_SEARCH_RESULTS: i64 = 20;

pub struct FetchWeatherTool;

#[async_trait]
impl Tool for FetchWeatherTool {
    fn name(&self) -> &str {
        "fetch_weather"
    }

    fn description(&self) -> &str {
        "Fetch current weather for a city"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Api
    }

    fn examples(&self) -> Vec<String> {
        vec!["What's the weather in London?".to_string()]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {"type": "string", "description": "City name"}
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let city = required_str(&input, "city")?;
        Ok(ToolResult::success(json!({
            "city": city,
            "temperature": 22,
            "condition": "Partly cloudy",
            "humidity": 65,
            "note": "Mock data",
        })))
    }
}

pub struct SearchWebTool;

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for information"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Api
    }

    fn examples(&self) -> Vec<String> {
        vec!["Search for Rust async runtimes".to_string()]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search query"},
                "max_results": {"type": "integer", "description": "Maximum results", "default": 5}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let query = required_str(&input, "query")?;
        let max_results = optional_i64(&input, "max_results", 5)?;
        if !(1..=MAX_SEARCH_RESULTS).contains(&max_results) {
            return Err(ToolError::InvalidInput(format!(
                "max_results must be between 1 and {MAX_SEARCH_RESULTS}"
            )));
        }

        let results: Vec<Value> = (1..=max_results)
            .map(|i| {
                json!({
                    "title": format!("Result {i} for '{query}'"),
                    "url": format!("https://example.com/result/{i}"),
                    "snippet": format!("Mock search result {i} about {query}"),
                })
            })
            .collect();

        Ok(ToolResult::success(json!({
            "query": query,
            "results": results,
            "total": max_results,
        })))
    }
}
