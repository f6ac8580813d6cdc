//! Agent that streams its reply word by word.

use crate::a2a::event_queue::{EventQueue, ExecutionState};
use crate::a2a::executor::{AgentExecutor, RequestContext};
use crate::blueprints::simple::generate_response;
use async_trait::async_trait;
use std::time::Duration;

pub struct StreamingAgentExecutor {
    chunk_delay: Duration,
}

impl StreamingAgentExecutor {
    pub fn new(chunk_delay: Duration) -> Self {
        Self { chunk_delay }
    }
}

#[async_trait]
impl AgentExecutor for StreamingAgentExecutor {
    async fn execute(&self, ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<()> {
        queue
            .state(ExecutionState::Thinking, "Starting to generate response...")
            .await?;

        let reply = generate_response(&ctx.task_instruction);
        let token = ctx.cancellation_token();
        for (i, word) in reply.split_whitespace().enumerate() {
            if i > 0 && !self.chunk_delay.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(self.chunk_delay) => {}
                }
            }
            if token.is_cancelled() {
                tracing::debug!("Streaming for task {} stopped after {} chunks", ctx.task_id, i);
                return Ok(());
            }
            queue.text_chunk(format!("{word} ")).await?;
        }

        queue
            .state(ExecutionState::Completed, "Streaming complete!")
            .await?;
        Ok(())
    }

    async fn cancel(&self, _ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<()> {
        queue
            .state(ExecutionState::Cancelled, "Streaming cancelled.")
            .await?;
        Ok(())
    }
}
