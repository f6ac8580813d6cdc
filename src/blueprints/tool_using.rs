//! Agent that routes requests to the tool registry by keyword.
//!
//! Routing is deliberately simple pattern matching. The LLM blueprint in
//! [`super::llm_tools`] shows model-driven selection over the same registry.

use crate::a2a::event_queue::{EventQueue, ExecutionState};
use crate::a2a::executor::{AgentExecutor, RequestContext};
use crate::tools::{ToolRegistry, ToolResult};
use anyhow::Context;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

static TOOL_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*/tool\s+(\S+)(?:\s+(.*))?$").expect("valid regex"));
static API_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(api|call)\b").expect("valid regex"));
static DICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(roll|dice|die)\b").expect("valid regex"));
static DICE_NOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+)?d(\d+)\b").expect("valid regex"));
static DICE_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+)\s+(?:dice|die)\b").expect("valid regex"));
static DICE_SIDES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+)[- ]sided\b").expect("valid regex"));
static PRIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bprime\b").expect("valid regex"));
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").expect("valid regex"));
static CALCULATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:calculate|compute|evaluate)\b:?\s*(.+)$").expect("valid regex")
});
static BARE_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s.()]*\d[\d\s.()]*[-+*/%^][\d\s.()+\-*/%^]*$").expect("valid regex"));
static TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(time|date|clock)\b").expect("valid regex"));
static TIMEZONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(utc|local)\b|([+-]\d{2}:\d{2})").expect("valid regex"));
static BY_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:by words?|word order|words)\b").expect("valid regex"));
static REVERSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\breverse\b\s*(.*)$").expect("valid regex"));
static ANALYZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:analy[sz]e|word count)\b(?:\s+(?:this|the))?(?:\s+text)?:?\s*(.*)$")
        .expect("valid regex")
});
static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("valid regex"));
static CONVERT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(-?\d+(?:\.\d+)?)\s*(celsius|fahrenheit|meters?|metres?|feet|foot|ft|kilograms?|kg|pounds?|lbs?|c|f|m)\s+(?:to|in|into)\s+(celsius|fahrenheit|meters?|metres?|feet|foot|ft|kilograms?|kg|pounds?|lbs?|c|f|m)\b",
    )
    .expect("valid regex")
});
static WEATHER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bweather\b").expect("valid regex"));
static CITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:in|for|at)\s+([A-Za-z][A-Za-z .'-]*[A-Za-z])").expect("valid regex")
});
static SEARCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:search(?:\s+(?:the\s+)?web)?|look\s+up)(?:\s+for)?\s+(.+)$")
        .expect("valid regex")
});

pub struct ToolUsingAgentExecutor {
    tools: ToolRegistry,
}

impl ToolUsingAgentExecutor {
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Pick a tool for `user_message`, run it, and render the reply.
    pub async fn process(&self, user_message: &str) -> anyhow::Result<String> {
        if let Some(caps) = TOOL_COMMAND.captures(user_message) {
            let name = &caps[1];
            let args = match caps.get(2).map(|m| m.as_str().trim()) {
                Some(raw) if !raw.is_empty() => serde_json::from_str(raw)
                    .with_context(|| format!("Invalid JSON arguments for '{name}'"))?,
                _ => json!({}),
            };
            return self.run_tool(name, args).await;
        }

        let lower = user_message.to_lowercase();

        if lower.contains("tool 1") || lower.contains("example 1") {
            let result = self
                .tools
                .invoke("tool_example_1", json!({"param1": "example input", "param2": 5}))
                .await?;
            return Ok(format!("Executed Tool 1:\n{}", result.to_text()));
        }
        if lower.contains("tool 2") || lower.contains("example 2") {
            let result = self
                .tools
                .invoke("tool_example_2", json!({"data": "sample data"}))
                .await?;
            return Ok(format!("Executed Tool 2:\n{}", result.to_text()));
        }
        if lower.contains("list tools") || lower.contains("what can you do") {
            return Ok(self.list_tools());
        }

        if let Some((name, args)) = route_builtin(user_message, &lower) {
            return self.run_tool(name, args).await;
        }

        if API_CALL.is_match(&lower) {
            let result = self
                .tools
                .invoke("api_call", json!({"endpoint": "https://api.example.com/data"}))
                .await?;
            return Ok(format!("API Call Result:\n{}", result.to_text()));
        }

        Ok(format!(
            "I didn't understand which tool to use for: '{}'\n\nAvailable tools: {}\nTry saying 'list tools' to see what I can do!",
            user_message,
            self.tools.list_tools().join(", ")
        ))
    }

    fn list_tools(&self) -> String {
        let lines: Vec<String> = self
            .tools
            .list_tools()
            .into_iter()
            .filter_map(|name| {
                self.tools
                    .description(&name)
                    .ok()
                    .map(|d| format!("- {name}: {d}"))
            })
            .collect();
        format!("Available tools:\n{}", lines.join("\n"))
    }

    async fn run_tool(&self, name: &str, args: Value) -> anyhow::Result<String> {
        let result = self.tools.invoke(name, args).await?;
        Ok(render_result(name, &result))
    }
}

/// Reply text for a finished tool call.
pub fn render_result(name: &str, result: &ToolResult) -> String {
    if result.success {
        format!("Result from {name}:\n{}", result.to_text())
    } else {
        format!("Tool {name} reported an error:\n{}", result.to_text())
    }
}

/// Keyword routing onto the built-in tools.
fn route_builtin(message: &str, lower: &str) -> Option<(&'static str, Value)> {
    if let Some(caps) = CONVERT.captures(lower) {
        let value: f64 = caps[1].parse().ok()?;
        return Some((
            "convert_units",
            json!({
                "value": value,
                "from_unit": normalize_unit(&caps[2]),
                "to_unit": normalize_unit(&caps[3]),
            }),
        ));
    }
    if DICE.is_match(lower) {
        return Some(("roll_dice", dice_args(lower)));
    }
    if PRIME.is_match(lower) {
        let number: i64 = INTEGER.find(lower)?.as_str().parse().ok()?;
        return Some(("is_prime", json!({"number": number})));
    }
    if let Some(caps) = CALCULATE.captures(message) {
        let expression = caps[1].trim().trim_end_matches('?').trim();
        return Some(("calculate", json!({"expression": expression})));
    }
    let trimmed = message.trim().trim_end_matches(['?', '=']).trim();
    if BARE_EXPRESSION.is_match(trimmed) {
        return Some(("calculate", json!({"expression": trimmed})));
    }
    if let Some(caps) = REVERSE.captures(message) {
        let by_word = BY_WORD.is_match(lower);
        let text = quoted(message).unwrap_or_else(|| caps[1].trim().to_string());
        return Some(("reverse_text", json!({"text": text, "by_word": by_word})));
    }
    if let Some(caps) = ANALYZE.captures(message) {
        let text = quoted(message).unwrap_or_else(|| caps[1].trim().to_string());
        return Some(("analyze_text", json!({"text": text})));
    }
    if WEATHER.is_match(lower) {
        let city = CITY
            .captures(message)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_else(|| "London".to_string());
        return Some(("fetch_weather", json!({"city": city})));
    }
    if let Some(caps) = SEARCH.captures(message) {
        let query = quoted(message).unwrap_or_else(|| caps[1].trim().trim_end_matches('?').to_string());
        return Some(("search_web", json!({"query": query})));
    }
    if TIME.is_match(lower) {
        let timezone = TIMEZONE
            .captures(message)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "UTC".to_string());
        return Some(("get_current_time", json!({"timezone": timezone})));
    }
    None
}

fn dice_args(lower: &str) -> Value {
    let mut sides = 6;
    let mut count = 1;
    if let Some(caps) = DICE_NOTATION.captures(lower) {
        count = caps.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(1);
        sides = caps[2].parse().unwrap_or(6);
    } else {
        if let Some(caps) = DICE_COUNT.captures(lower) {
            count = caps[1].parse().unwrap_or(1);
        }
        if let Some(caps) = DICE_SIDES.captures(lower) {
            sides = caps[1].parse().unwrap_or(6);
        }
    }
    json!({"sides": sides, "count": count})
}

fn quoted(message: &str) -> Option<String> {
    QUOTED
        .captures(message)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
}

fn normalize_unit(unit: &str) -> &'static str {
    match unit {
        "c" | "celsius" => "celsius",
        "f" | "fahrenheit" => "fahrenheit",
        "m" | "meter" | "meters" | "metre" | "metres" => "meters",
        "ft" | "foot" | "feet" => "feet",
        "kg" | "kilogram" | "kilograms" => "kilograms",
        _ => "pounds",
    }
}

#[async_trait]
impl AgentExecutor for ToolUsingAgentExecutor {
    async fn execute(&self, ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<()> {
        queue
            .state(
                ExecutionState::Thinking,
                "Analyzing your request and selecting appropriate tool...",
            )
            .await?;

        match self.process(&ctx.task_instruction).await {
            Ok(result) => {
                queue.text(result).await?;
                queue.state(ExecutionState::Completed, "Task completed!").await?;
            }
            Err(e) => {
                tracing::warn!("Tool routing failed for task {}: {:#}", ctx.task_id, e);
                queue
                    .state(ExecutionState::Failed, format!("Error: {e:#}"))
                    .await?;
            }
        }
        Ok(())
    }

    async fn cancel(&self, _ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<()> {
        queue.state(ExecutionState::Cancelled, "Task cancelled.").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprints::test_support::{context, last_state, run, run_cancel, response_text};
    use rstest::rstest;

    fn executor() -> ToolUsingAgentExecutor {
        ToolUsingAgentExecutor::new(ToolRegistry::with_builtin())
    }

    #[rstest]
    #[case("roll a d20", "roll_dice", json!({"sides": 20, "count": 1}))]
    #[case("roll 3 dice", "roll_dice", json!({"sides": 6, "count": 3}))]
    #[case("is 17 prime?", "is_prime", json!({"number": 17}))]
    #[case("calculate 2 + 3 * 4", "calculate", json!({"expression": "2 + 3 * 4"}))]
    #[case("(1 + 2) * 3", "calculate", json!({"expression": "(1 + 2) * 3"}))]
    #[case("what time is it in +05:30", "get_current_time", json!({"timezone": "+05:30"}))]
    #[case("what's the date", "get_current_time", json!({"timezone": "UTC"}))]
    #[case("reverse 'hello world'", "reverse_text", json!({"text": "hello world", "by_word": false}))]
    #[case("reverse the words in 'one two'", "reverse_text", json!({"text": "one two", "by_word": true}))]
    #[case("convert 100 C to F", "convert_units", json!({"value": 100.0, "from_unit": "celsius", "to_unit": "fahrenheit"}))]
    #[case("weather in Paris?", "fetch_weather", json!({"city": "Paris"}))]
    #[case("search for rust async", "search_web", json!({"query": "rust async"}))]
    fn test_route_builtin(#[case] message: &str, #[case] tool: &str, #[case] args: Value) {
        let lower = message.to_lowercase();
        assert_eq!(route_builtin(message, &lower), Some((tool, args)));
    }

    #[test]
    fn test_api_keyword_needs_word_boundary() {
        let lower = "what is the capital of france";
        assert!(!API_CALL.is_match(lower));
        assert!(route_builtin(lower, lower).is_none());
    }

    #[tokio::test]
    async fn test_example_tool_routes() {
        let exec = executor();
        assert_eq!(
            exec.process("run tool 1").await.expect("reply"),
            "Executed Tool 1:\nTool 1 executed with param1='example input' and param2=5"
        );
        assert!(exec
            .process("use example 2")
            .await
            .expect("reply")
            .starts_with("Executed Tool 2:\n"));
        assert_eq!(
            exec.process("make an API call").await.expect("reply"),
            "API Call Result:\nWould call GET https://api.example.com/data"
        );
    }

    #[tokio::test]
    async fn test_list_tools() {
        let reply = executor().process("what can you do?").await.expect("reply");
        assert!(reply.starts_with("Available tools:\n"));
        assert!(reply.contains("- roll_dice: "));
        assert_eq!(reply.lines().count(), 13);
        assert!(!reply.contains("read_file"));
    }

    #[tokio::test]
    async fn test_structured_tool_command() {
        let reply = executor()
            .process(r#"/tool reverse_text {"text": "abc"}"#)
            .await
            .expect("reply");
        assert_eq!(reply, "Result from reverse_text:\ncba");
    }

    #[tokio::test]
    async fn test_soft_failure_is_rendered() {
        let reply = executor()
            .process("calculate 1 / 0")
            .await
            .expect("reply");
        assert!(reply.starts_with("Tool calculate reported an error:"));
        assert!(reply.contains("division by zero"));
    }

    #[tokio::test]
    async fn test_deeply_nested_expression_is_refused() {
        let message = format!("calculate {}1", "(".repeat(20_000));
        let reply = executor().process(&message).await.expect("reply");
        assert!(reply.starts_with("Tool calculate reported an error:"));
        assert!(reply.contains("nested too deeply"));
    }

    #[tokio::test]
    async fn test_fallback_lists_tool_names() {
        let reply = executor().process("sing me a song").await.expect("reply");
        assert!(reply.starts_with("I didn't understand which tool to use for: 'sing me a song'"));
        assert!(reply.contains("tool_example_1"));
    }

    #[tokio::test]
    async fn test_execute_completes() {
        let (result, events) = run(&executor(), &context("is 7 prime")).await;
        assert!(result.is_ok());
        assert!(response_text(&events).contains("7 is prime!"));
        assert_eq!(
            last_state(&events),
            Some((ExecutionState::Completed, Some("Task completed!".to_string())))
        );
    }

    #[tokio::test]
    async fn test_execute_unknown_tool_fails() {
        let (result, events) = run(&executor(), &context("/tool nope {}")).await;
        assert!(result.is_ok());
        assert_eq!(
            last_state(&events),
            Some((
                ExecutionState::Failed,
                Some("Error: Tool 'nope' not found".to_string())
            ))
        );
    }

    #[tokio::test]
    async fn test_execute_bad_json_fails() {
        let (_, events) = run(&executor(), &context("/tool calculate {oops")).await;
        let (state, description) = last_state(&events).expect("state");
        assert_eq!(state, ExecutionState::Failed);
        assert!(description
            .expect("description")
            .starts_with("Error: Invalid JSON arguments for 'calculate'"));
    }

    #[tokio::test]
    async fn test_cancel() {
        let events = run_cancel(&executor(), &context("x")).await;
        assert_eq!(
            last_state(&events),
            Some((ExecutionState::Cancelled, Some("Task cancelled.".to_string())))
        );
    }
}
