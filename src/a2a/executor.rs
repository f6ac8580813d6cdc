//! Executor contract implemented by every blueprint.

use crate::a2a::event_queue::EventQueue;
use crate::a2a::types::Message;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Read-only view of the request an executor is working on.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub task_id: String,
    /// Session identifier shared by related tasks.
    pub context_id: String,
    pub message: Message,
    /// Text parts of the incoming message, joined by newlines.
    pub task_instruction: String,
    pub metadata: HashMap<String, serde_json::Value>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(task_id: impl Into<String>, context_id: impl Into<String>, message: Message) -> Self {
        let task_instruction = message.text();
        let metadata = message.metadata.clone().unwrap_or_default();
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            message,
            task_instruction,
            metadata,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Business logic of an agent.
///
/// `execute` runs once per incoming task and reports progress through the
/// queue. Returning `Err` fails the task with the error's message.
#[async_trait]
pub trait AgentExecutor: Send + Sync + 'static {
    async fn execute(&self, ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<()>;

    async fn cancel(&self, ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<()>;
}
