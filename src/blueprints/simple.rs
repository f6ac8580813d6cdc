//! Greeting/echo agent. The smallest useful executor.

use crate::a2a::event_queue::{EventQueue, ExecutionState};
use crate::a2a::executor::{AgentExecutor, RequestContext};
use async_trait::async_trait;

pub struct SimpleAgentExecutor;

/// Reply for a user message. Replace with real agent logic.
pub fn generate_response(user_message: &str) -> String {
    let lower = user_message.to_lowercase();
    if lower.contains("hello") {
        "Hello! I'm a simple A2A agent. How can I help you today?".to_string()
    } else if lower.contains("help") {
        "I'm a simple agent that can respond to your messages. Ask me anything!".to_string()
    } else {
        format!(
            "You said: '{user_message}'. I'm a simple agent template - customize me to do more!"
        )
    }
}

#[async_trait]
impl AgentExecutor for SimpleAgentExecutor {
    async fn execute(&self, ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<()> {
        queue
            .state(ExecutionState::Thinking, "Processing your request...")
            .await?;

        let response = generate_response(&ctx.task_instruction);
        queue.text(response).await?;

        queue
            .state(ExecutionState::Completed, "Task completed successfully!")
            .await?;
        Ok(())
    }

    async fn cancel(&self, _ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<()> {
        queue
            .state(ExecutionState::Cancelled, "Task cancelled by user.")
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::event_queue::ExecutionEvent;
    use crate::blueprints::test_support::{context, last_state, run, run_cancel, response_text};
    use rstest::rstest;

    #[rstest]
    #[case("Hello there", "Hello! I'm a simple A2A agent. How can I help you today?")]
    #[case("HELP me", "I'm a simple agent that can respond to your messages. Ask me anything!")]
    #[case(
        "What is 2+2?",
        "You said: 'What is 2+2?'. I'm a simple agent template - customize me to do more!"
    )]
    fn test_generate_response(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(generate_response(input), expected);
    }

    #[test]
    fn test_hello_wins_over_help() {
        assert!(generate_response("hello, help").starts_with("Hello!"));
    }

    #[tokio::test]
    async fn test_execute_event_sequence() {
        let ctx = context("hello");
        let (result, events) = run(&SimpleAgentExecutor, &ctx).await;
        assert!(result.is_ok());
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            ExecutionEvent::state(ExecutionState::Thinking, "Processing your request...")
        );
        assert!(matches!(&events[1], ExecutionEvent::Text { append: false, .. }));
        assert_eq!(response_text(&events), generate_response("hello"));
        assert_eq!(
            last_state(&events),
            Some((
                ExecutionState::Completed,
                Some("Task completed successfully!".to_string())
            ))
        );
    }

    #[tokio::test]
    async fn test_cancel() {
        let events = run_cancel(&SimpleAgentExecutor, &context("hello")).await;
        assert_eq!(
            events,
            vec![ExecutionEvent::state(
                ExecutionState::Cancelled,
                "Task cancelled by user."
            )]
        );
    }
}
