//! Placeholder Provider
//!
//! Stands in when no API key is configured so the server can still start.

use async_trait::async_trait;

use super::{LlmError, LlmProvider, LlmRequest, LlmResponse, Result};

pub struct PlaceholderProvider;

#[async_trait]
impl LlmProvider for PlaceholderProvider {
    fn name(&self) -> &str {
        "none"
    }

    fn default_model(&self) -> &str {
        "none"
    }

    async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse> {
        Err(LlmError::NotConfigured(
            "No LLM provider configured. Set OPENAI_API_KEY or llm.api_key to enable LLM tool selection."
                .to_string(),
        ))
    }
}
