//! Agent that lets an LLM choose the tool via function calling.

use crate::a2a::event_queue::{EventQueue, ExecutionState};
use crate::a2a::executor::{AgentExecutor, RequestContext};
use crate::blueprints::tool_using::render_result;
use crate::llm::{ChatMessage, LlmProvider, LlmRequest};
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are a helpful agent with access to tools. \
Call a tool when one fits the request. Otherwise answer directly and briefly.";

pub struct LlmToolUsingAgentExecutor {
    provider: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    model: String,
}

impl LlmToolUsingAgentExecutor {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: ToolRegistry, model: String) -> Self {
        Self {
            provider,
            tools,
            model,
        }
    }

    async fn process(&self, user_message: &str) -> anyhow::Result<String> {
        let request = LlmRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(user_message),
            ],
            tools: self.tools.function_schemas(),
            temperature: Some(0.0),
        };
        let response = self.provider.complete(request).await?;

        if response.tool_calls.is_empty() {
            return Ok(response
                .content
                .unwrap_or_else(|| "The model returned an empty response.".to_string()));
        }

        let mut outputs = Vec::with_capacity(response.tool_calls.len());
        for call in response.tool_calls {
            tracing::info!("LLM selected tool '{}' ({})", call.name, call.id);
            let result = self.tools.invoke(&call.name, call.arguments).await?;
            outputs.push(render_result(&call.name, &result));
        }
        Ok(outputs.join("\n\n"))
    }
}

#[async_trait]
impl AgentExecutor for LlmToolUsingAgentExecutor {
    async fn execute(&self, ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<()> {
        queue
            .state(
                ExecutionState::Thinking,
                "Using LLM to determine appropriate action...",
            )
            .await?;

        match self.process(&ctx.task_instruction).await {
            Ok(result) => {
                queue.text(result).await?;
                queue.state(ExecutionState::Completed, "Completed!").await?;
            }
            Err(e) => {
                tracing::warn!("LLM tool selection failed for task {}: {}", ctx.task_id, e);
                queue
                    .state(ExecutionState::Failed, format!("Error: {e}"))
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
    use crate::blueprints::test_support::{context, last_state, run, response_text};
    use crate::llm::{LlmResponse, PlaceholderProvider, ToolCall};
    use serde_json::json;
    use tokio::sync::Mutex;

    /// Returns a canned response and records the request it saw.
    struct ScriptedProvider {
        response: LlmResponse,
        seen: Mutex<Option<LlmRequest>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: LlmRequest) -> crate::llm::Result<LlmResponse> {
            *self.seen.lock().await = Some(request);
            Ok(self.response.clone())
        }
    }

    fn executor_with(response: LlmResponse) -> (LlmToolUsingAgentExecutor, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider {
            response,
            seen: Mutex::new(None),
        });
        let executor = LlmToolUsingAgentExecutor::new(
            provider.clone(),
            ToolRegistry::with_builtin(),
            "test-model".to_string(),
        );
        (executor, provider)
    }

    #[tokio::test]
    async fn test_runs_selected_tool() {
        let (executor, provider) = executor_with(LlmResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                name: "reverse_text".to_string(),
                arguments: json!({"text": "llm"}),
            }],
        });

        let (result, events) = run(&executor, &context("reverse llm")).await;
        assert!(result.is_ok());
        assert_eq!(response_text(&events), "Result from reverse_text:\nmll");
        assert_eq!(
            last_state(&events),
            Some((ExecutionState::Completed, Some("Completed!".to_string())))
        );

        let seen = provider.seen.lock().await.clone().expect("request");
        assert_eq!(seen.model, "test-model");
        assert_eq!(seen.tools.len(), 12);
        assert_eq!(seen.messages[1].content, "reverse llm");
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let (executor, _) = executor_with(LlmResponse {
            content: Some("Paris.".to_string()),
            tool_calls: vec![],
        });
        let (_, events) = run(&executor, &context("capital of France?")).await;
        assert_eq!(response_text(&events), "Paris.");
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_task() {
        let (executor, _) = executor_with(LlmResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                name: "launch_rocket".to_string(),
                arguments: json!({}),
            }],
        });
        let (_, events) = run(&executor, &context("go")).await;
        assert_eq!(
            last_state(&events),
            Some((
                ExecutionState::Failed,
                Some("Error: Tool 'launch_rocket' not found".to_string())
            ))
        );
    }

    #[tokio::test]
    async fn test_placeholder_provider_fails_with_hint() {
        let executor = LlmToolUsingAgentExecutor::new(
            Arc::new(PlaceholderProvider),
            ToolRegistry::with_builtin(),
            "none".to_string(),
        );
        let (_, events) = run(&executor, &context("hi")).await;
        let (state, description) = last_state(&events).expect("state");
        assert_eq!(state, ExecutionState::Failed);
        assert!(description.expect("description").contains("OPENAI_API_KEY"));
    }
}
