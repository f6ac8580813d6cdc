//! Text processing tools.

use super::error::Result;
use super::r#trait::{Tool, ToolCategory, ToolResult, optional_bool, required_str};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashSet;

pub struct AnalyzeTextTool;

/// Character, word and sentence statistics for `text`.
pub fn analyze(text: &str) -> Value {
    let words: Vec<&str> = text.split_whitespace().collect();
    let sentence_count = text.split('.').filter(|s| !s.trim().is_empty()).count();
    let average_word_length = if words.is_empty() {
        0.0
    } else {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64
    };
    let unique_words: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();

    json!({
        "character_count": text.chars().count(),
        "word_count": words.len(),
        "sentence_count": sentence_count,
        "average_word_length": average_word_length,
        "unique_words": unique_words.len(),
    })
}

#[async_trait]
impl Tool for AnalyzeTextTool {
    fn name(&self) -> &str {
        "analyze_text"
    }

    fn description(&self) -> &str {
        "Analyze text and return statistics"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Text
    }

    fn examples(&self) -> Vec<String> {
        vec!["Analyze this text".to_string(), "Get word count".to_string()]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "The text to analyze"}
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let text = required_str(&input, "text")?;
        Ok(ToolResult::success(analyze(text)))
    }
}

pub struct ReverseTextTool;

#[async_trait]
impl Tool for ReverseTextTool {
    fn name(&self) -> &str {
        "reverse_text"
    }

    fn description(&self) -> &str {
        "Reverse text by characters or words"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Text
    }

    fn examples(&self) -> Vec<String> {
        vec!["Reverse 'hello'".to_string(), "Reverse word order".to_string()]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "The text to reverse"},
                "by_word": {
                    "type": "boolean",
                    "description": "Reverse word order instead of characters",
                    "default": false
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let text = required_str(&input, "text")?;
        let reversed = if optional_bool(&input, "by_word", false) {
            text.split_whitespace().rev().collect::<Vec<_>>().join(" ")
        } else {
            text.chars().rev().collect()
        };
        Ok(ToolResult::success(reversed))
    }
}
