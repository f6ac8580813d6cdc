//! LLM provider abstraction used by the LLM tool-calling blueprint.

pub mod openai;
pub mod placeholder;

pub use openai::OpenAiCompatibleProvider;
pub use placeholder::PlaceholderProvider;

use crate::config::LlmConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// `{name, description, parameters}` function schemas.
    pub tools: Vec<Value>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Parsed arguments object.
    pub arguments: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    fn default_model(&self) -> &str;

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// An OpenAI-compatible provider when a key is configured, the placeholder
/// otherwise.
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            let provider = OpenAiCompatibleProvider::new(
                config.base_url.clone(),
                key.to_string(),
                config.model.clone(),
                std::time::Duration::from_secs(config.timeout_secs),
            )?;
            tracing::info!(
                "Using OpenAI-compatible provider at {} (model {})",
                config.base_url,
                config.model
            );
            Ok(Arc::new(provider))
        }
        _ => {
            tracing::warn!("No LLM API key configured, LLM blueprint will report an error per task");
            Ok(Arc::new(PlaceholderProvider))
        }
    }
}
