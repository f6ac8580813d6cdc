//! The blueprint agents: one [`AgentExecutor`] per starter scaffold.

pub mod llm_tools;
pub mod orchestrator;
pub mod simple;
pub mod streaming;
pub mod tool_using;

use crate::a2a::executor::AgentExecutor;
use crate::config::Config;
use crate::tools::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;

pub use llm_tools::LlmToolUsingAgentExecutor;
pub use orchestrator::{OrchestratorExecutor, Strategy, SubAgent};
pub use simple::SimpleAgentExecutor;
pub use streaming::StreamingAgentExecutor;
pub use tool_using::ToolUsingAgentExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Blueprint {
    Simple,
    Streaming,
    ToolUsing,
    LlmTools,
    Orchestrator,
}

impl Blueprint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Blueprint::Simple => "simple",
            Blueprint::Streaming => "streaming",
            Blueprint::ToolUsing => "tool-using",
            Blueprint::LlmTools => "llm-tools",
            Blueprint::Orchestrator => "orchestrator",
        }
    }

    /// Port used when neither config nor flags set one.
    pub fn default_port(&self) -> u16 {
        match self {
            Blueprint::Orchestrator => 10000,
            _ => 9999,
        }
    }

    pub fn build_executor(&self, config: &Config) -> anyhow::Result<Arc<dyn AgentExecutor>> {
        let executor: Arc<dyn AgentExecutor> = match self {
            Blueprint::Simple => Arc::new(SimpleAgentExecutor),
            Blueprint::Streaming => Arc::new(StreamingAgentExecutor::new(Duration::from_millis(
                config.streaming.chunk_delay_ms,
            ))),
            Blueprint::ToolUsing => Arc::new(ToolUsingAgentExecutor::new(ToolRegistry::from_config(&config.tools))),
            Blueprint::LlmTools => Arc::new(LlmToolUsingAgentExecutor::new(
                crate::llm::from_config(&config.llm)?,
                ToolRegistry::from_config(&config.tools),
                config.llm.model.clone(),
            )),
            Blueprint::Orchestrator => Arc::new(OrchestratorExecutor::from_config(&config.orchestrator)?),
        };
        Ok(executor)
    }
}

impl std::fmt::Display for Blueprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::a2a::event_queue::{EventQueue, ExecutionEvent, ExecutionState};
    use crate::a2a::executor::{AgentExecutor, RequestContext};
    use crate::a2a::types::Message;

    pub fn context(text: &str) -> RequestContext {
        RequestContext::new("task-1", "ctx-1", Message::user_text(text))
    }

    /// Run `execute` to completion and return its result and every event.
    pub async fn run(
        executor: &dyn AgentExecutor,
        ctx: &RequestContext,
    ) -> (anyhow::Result<()>, Vec<ExecutionEvent>) {
        let (queue, mut rx) = EventQueue::channel();
        let result = executor.execute(ctx, &queue).await;
        drop(queue);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events)
    }

    pub async fn run_cancel(executor: &dyn AgentExecutor, ctx: &RequestContext) -> Vec<ExecutionEvent> {
        let (queue, mut rx) = EventQueue::channel();
        executor.cancel(ctx, &queue).await.expect("cancel");
        drop(queue);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    /// The concatenated response text, honoring `append` semantics.
    pub fn response_text(events: &[ExecutionEvent]) -> String {
        events.iter().fold(String::new(), |mut acc, event| {
            if let ExecutionEvent::Text { text, append } = event {
                if !*append {
                    acc.clear();
                }
                acc.push_str(text);
            }
            acc
        })
    }

    pub fn last_state(events: &[ExecutionEvent]) -> Option<(ExecutionState, Option<String>)> {
        events.iter().rev().find_map(|event| match event {
            ExecutionEvent::State { state, description } => Some((*state, description.clone())),
            _ => None,
        })
    }
}
