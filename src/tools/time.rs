//! Date and time tool.

use super::error::{Result, ToolError};
use super::r#trait::{Tool, ToolCategory, ToolResult, optional_str};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, Utc};
use serde_json::{Value, json};

pub struct CurrentTimeTool;

/// `UTC`, `local`, or a fixed offset such as `+05:30`.
fn now_in(timezone: &str) -> Result<DateTime<FixedOffset>> {
    if timezone.eq_ignore_ascii_case("utc") || timezone.eq_ignore_ascii_case("z") {
        return Ok(Utc::now().fixed_offset());
    }
    if timezone.eq_ignore_ascii_case("local") {
        return Ok(Local::now().fixed_offset());
    }
    let offset: FixedOffset = timezone.parse().map_err(|_| {
        ToolError::InvalidInput(format!(
            "Unknown timezone '{timezone}'. Use UTC, local, or an offset like +05:30"
        ))
    })?;
    Ok(Utc::now().with_timezone(&offset))
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Time
    }

    fn examples(&self) -> Vec<String> {
        vec!["What time is it?".to_string(), "Get current time".to_string()]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "timezone": {
                    "type": "string",
                    "description": "UTC, local, or a UTC offset such as +05:30",
                    "default": "UTC"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let timezone = optional_str(&input, "timezone", "UTC");
        let now = now_in(timezone)?;
        Ok(ToolResult::success(json!({
            "timestamp": now.to_rfc3339(),
            "date": now.format("%Y-%m-%d").to_string(),
            "time": now.format("%H:%M:%S").to_string(),
            "timezone": timezone,
        })))
    }
}
