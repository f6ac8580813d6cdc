//! Orchestrator agent: delegates the request to other A2A agents.
//!
//! Sub-agents are driven with a non-blocking `message/send` followed by
//! `tasks/get` polling, so cancellation is observed while a sub-agent works
//! and the remote task can be cancelled in turn.

use crate::a2a::client::A2aClient;
use crate::a2a::event_queue::{EventQueue, ExecutionState};
use crate::a2a::executor::{AgentExecutor, RequestContext};
use crate::a2a::types::{AgentCard, Task, TaskState};
use crate::config::{OrchestratorConfig, SubAgentConfig};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One agent after another, each seeing earlier results.
    #[default]
    Sequential,
    /// All agents at once.
    Parallel,
    /// Agents picked by keyword; stops at the first success.
    Conditional,
    /// Generator/critic refinement loop over the first two agents.
    Iterative,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Strategy::Sequential => "sequential",
            Strategy::Parallel => "parallel",
            Strategy::Conditional => "conditional",
            Strategy::Iterative => "iterative",
        };
        f.write_str(s)
    }
}

/// A remote agent with a lazily created client and cached card.
pub struct SubAgent {
    pub name: String,
    pub url: String,
    pub description: String,
    timeout: Duration,
    client: OnceCell<A2aClient>,
    card: OnceCell<AgentCard>,
}

impl SubAgent {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            description: description.into(),
            timeout,
            client: OnceCell::new(),
            card: OnceCell::new(),
        }
    }

    pub fn from_config(config: &SubAgentConfig, timeout: Duration) -> Self {
        Self::new(&config.name, &config.url, &config.description, timeout)
    }

    pub async fn client(&self) -> anyhow::Result<&A2aClient> {
        self.client
            .get_or_try_init(|| async { A2aClient::new(&self.url).with_timeout(self.timeout) })
            .await
    }

    pub async fn card(&self) -> anyhow::Result<&AgentCard> {
        self.card
            .get_or_try_init(|| async { self.client().await?.get_agent_card().await })
            .await
    }

    /// Lowercase words this agent answers to: its name, description words
    /// and the tags on its card. A card that cannot be fetched contributes
    /// nothing.
    pub async fn keywords(&self) -> HashSet<String> {
        let mut keywords: HashSet<String> = words(&self.name).into_iter().collect();
        keywords.insert(self.name.to_lowercase());
        keywords.extend(words(&self.description));
        match self.card().await {
            Ok(card) => {
                keywords.extend(
                    card.skills
                        .iter()
                        .flat_map(|s| s.tags.iter())
                        .map(|t| t.to_lowercase()),
                );
            }
            Err(e) => tracing::debug!("No card for {}: {:#}", self.name, e),
        }
        keywords
    }
}

/// Lowercase words of at least four characters.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 4)
        .map(str::to_lowercase)
        .collect()
}

pub struct OrchestratorExecutor {
    agents: Vec<SubAgent>,
    strategy: Strategy,
    max_iterations: usize,
    approval_marker: String,
    poll_interval: Duration,
    /// Remote tasks still running, keyed by our task id.
    in_flight: Mutex<HashMap<String, Vec<(usize, String)>>>,
}

impl OrchestratorExecutor {
    pub fn new(agents: Vec<SubAgent>, strategy: Strategy) -> Self {
        Self {
            agents,
            strategy,
            max_iterations: 3,
            approval_marker: "APPROVED".to_string(),
            poll_interval: Duration::from_millis(250),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> anyhow::Result<Self> {
        if config.max_iterations == 0 {
            anyhow::bail!("orchestrator.max_iterations must be at least 1");
        }
        if config.approval_marker.trim().is_empty() {
            anyhow::bail!("orchestrator.approval_marker must not be empty");
        }
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let agents = config
            .sub_agents
            .iter()
            .map(|a| SubAgent::from_config(a, timeout))
            .collect();
        Ok(Self::new(agents, config.strategy)
            .with_max_iterations(config.max_iterations)
            .with_approval_marker(config.approval_marker.clone())
            .with_poll_interval(Duration::from_millis(config.poll_interval_ms)))
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_approval_marker(mut self, marker: impl Into<String>) -> Self {
        self.approval_marker = marker.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn agents(&self) -> &[SubAgent] {
        &self.agents
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    async fn orchestrate(&self, ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<String> {
        if self.agents.is_empty() {
            anyhow::bail!("No sub-agents configured");
        }
        let message = ctx.task_instruction.as_str();
        tracing::info!(
            "Orchestrating task {} across {} agents ({})",
            ctx.task_id,
            self.agents.len(),
            self.strategy
        );
        match self.strategy {
            Strategy::Sequential => self.sequential(ctx, queue, message).await,
            Strategy::Parallel => self.parallel(ctx, queue, message).await,
            Strategy::Conditional => self.conditional(ctx, queue, message).await,
            Strategy::Iterative => self.iterative(ctx, queue, message).await,
        }
    }

    async fn sequential(
        &self,
        ctx: &RequestContext,
        queue: &EventQueue,
        message: &str,
    ) -> anyhow::Result<String> {
        let mut results: Vec<(String, String)> = Vec::new();
        for (idx, agent) in self.agents.iter().enumerate() {
            ensure_not_cancelled(ctx)?;
            queue
                .text_chunk(format!("\n--- Delegating to {} ---\n", agent.name))
                .await?;
            let instruction = build_instruction(message, &results);
            let output = self.delegate(ctx, idx, &instruction).await?;
            queue.text_chunk(format!("{output}\n")).await?;
            results.push((agent.name.clone(), output));
        }
        Ok(synthesize(
            "Orchestration completed. Agents executed",
            &results,
        ))
    }

    async fn parallel(
        &self,
        ctx: &RequestContext,
        queue: &EventQueue,
        message: &str,
    ) -> anyhow::Result<String> {
        queue
            .text_chunk("Executing multiple agents in parallel...\n")
            .await?;

        let outcomes = futures::future::join_all(
            (0..self.agents.len()).map(|idx| self.delegate(ctx, idx, message)),
        )
        .await;

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for (agent, outcome) in self.agents.iter().zip(outcomes) {
            match outcome {
                Ok(output) => results.push((agent.name.clone(), output)),
                Err(e) => errors.push(format!("{}: {:#}", agent.name, e)),
            }
        }
        ensure_not_cancelled(ctx)?;
        if !errors.is_empty() {
            anyhow::bail!("Some agents failed: {}", errors.join("; "));
        }
        Ok(synthesize(
            "All agents completed successfully in parallel. Agents executed",
            &results,
        ))
    }

    async fn conditional(
        &self,
        ctx: &RequestContext,
        queue: &EventQueue,
        message: &str,
    ) -> anyhow::Result<String> {
        let selected = self.select_agents(message).await;
        let mut executed = Vec::new();
        let mut errors = Vec::new();

        for idx in selected {
            ensure_not_cancelled(ctx)?;
            let agent = &self.agents[idx];
            queue
                .text_chunk(format!("\n--- Selected {} for this task ---\n", agent.name))
                .await?;
            executed.push(agent.name.clone());
            match self.delegate(ctx, idx, message).await {
                Ok(output) => {
                    return Ok(format!("Executed agents: {}\n\n{}", executed.join(", "), output));
                }
                Err(e) => {
                    ensure_not_cancelled(ctx)?;
                    tracing::warn!("Selected agent {} failed: {:#}", agent.name, e);
                    queue.text_chunk(format!("{} failed: {:#}\n", agent.name, e)).await?;
                    errors.push(format!("{}: {:#}", agent.name, e));
                }
            }
        }
        anyhow::bail!("No selected agent completed the task: {}", errors.join("; "))
    }

    /// Agents whose keywords appear in the message, in configured order.
    /// Falls back to every agent when none match.
    async fn select_agents(&self, message: &str) -> Vec<usize> {
        let lower = message.to_lowercase();
        let message_words: HashSet<String> = words(message).into_iter().collect();
        let mut selected = Vec::new();
        for (idx, agent) in self.agents.iter().enumerate() {
            let keywords = agent.keywords().await;
            let named = lower.contains(&agent.name.to_lowercase());
            if named || keywords.iter().any(|k| message_words.contains(k)) {
                selected.push(idx);
            }
        }
        if selected.is_empty() {
            tracing::debug!("No agent matched, selecting all");
            return (0..self.agents.len()).collect();
        }
        selected
    }

    async fn iterative(
        &self,
        ctx: &RequestContext,
        queue: &EventQueue,
        message: &str,
    ) -> anyhow::Result<String> {
        if self.agents.len() < 2 {
            anyhow::bail!(
                "Iterative strategy needs a generator and a critic agent, {} configured",
                self.agents.len()
            );
        }

        let mut draft = String::new();
        let mut feedback: Option<String> = None;
        let mut iterations = 0;

        for iteration in 1..=self.max_iterations {
            ensure_not_cancelled(ctx)?;
            iterations = iteration;
            queue
                .text_chunk(format!("\n--- Iteration {iteration} ---\n"))
                .await?;

            queue.text_chunk("Generating...\n").await?;
            let instruction = match &feedback {
                None => message.to_string(),
                Some(review) => format!(
                    "{message}\n\nPrevious draft:\n{draft}\n\nReviewer feedback:\n{review}\n\nRevise the draft."
                ),
            };
            draft = self.delegate(ctx, 0, &instruction).await?;

            ensure_not_cancelled(ctx)?;
            queue.text_chunk("Reviewing...\n").await?;
            let review = self
                .delegate(ctx, 1, &self.review_instruction(message, &draft))
                .await?;

            if is_approval(&review, &self.approval_marker) {
                tracing::debug!("Draft approved after {} iterations", iteration);
                break;
            }
            feedback = Some(review);
        }

        Ok(format!("Completed after {iterations} iterations\n\n{draft}"))
    }

    fn review_instruction(&self, message: &str, draft: &str) -> String {
        format!(
            "Review the following answer. Reply with {} if it is satisfactory, otherwise explain what to improve.\n\nRequest:\n{message}\n\nAnswer:\n{draft}",
            self.approval_marker
        )
    }

    /// Send `instruction` to agent `idx` and wait for its answer.
    async fn delegate(
        &self,
        ctx: &RequestContext,
        idx: usize,
        instruction: &str,
    ) -> anyhow::Result<String> {
        let agent = &self.agents[idx];
        let client = agent.client().await?;
        let task = client
            .submit_text(instruction)
            .await
            .with_context(|| format!("{} did not accept the task", agent.name))?;
        tracing::debug!("Delegated to {} as remote task {}", agent.name, task.id);

        let remote_id = task.id.clone();
        if !self.track(ctx, idx, &remote_id).await {
            // cancelled while the submit was in flight, so cancel_remote missed it
            if let Err(e) = client.cancel_task(&remote_id).await {
                tracing::warn!(
                    "Failed to cancel remote task {} on {}: {:#}",
                    remote_id,
                    agent.name,
                    e
                );
            }
            anyhow::bail!("Cancelled while delegating to {}", agent.name);
        }
        let result = self.wait(ctx, agent, client, task).await;
        // after a cancel the cancel path owns the remote tasks
        if !ctx.is_cancelled() {
            self.untrack(&ctx.task_id, &remote_id).await;
        }

        let task = result?;
        match task.status.state {
            TaskState::Completed | TaskState::InputRequired => Ok(task.output_text()),
            state => anyhow::bail!(
                "{} finished in {:?} state: {}",
                agent.name,
                state,
                status_text(&task)
            ),
        }
    }

    async fn wait(
        &self,
        ctx: &RequestContext,
        agent: &SubAgent,
        client: &A2aClient,
        mut task: Task,
    ) -> anyhow::Result<Task> {
        let deadline = Instant::now() + agent.timeout;
        let token = ctx.cancellation_token();
        while !task.status.state.is_settled() {
            tokio::select! {
                _ = token.cancelled() => {
                    anyhow::bail!("Cancelled while waiting for {}", agent.name);
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
            if Instant::now() >= deadline {
                if let Err(e) = client.cancel_task(&task.id).await {
                    tracing::debug!("Could not cancel timed out task on {}: {:#}", agent.name, e);
                }
                anyhow::bail!(
                    "{} timed out after {}s",
                    agent.name,
                    agent.timeout.as_secs()
                );
            }
            task = client.get_task(&task.id, None).await?;
        }
        Ok(task)
    }

    /// Record a remote task. Returns false, recording nothing, once `ctx`
    /// is cancelled.
    async fn track(&self, ctx: &RequestContext, idx: usize, remote_id: &str) -> bool {
        let mut in_flight = self.in_flight.lock().await;
        // checked under the lock: cancel_remote runs only after the token trips
        if ctx.is_cancelled() {
            return false;
        }
        in_flight
            .entry(ctx.task_id.clone())
            .or_default()
            .push((idx, remote_id.to_string()));
        true
    }

    async fn untrack(&self, task_id: &str, remote_id: &str) {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(entries) = in_flight.get_mut(task_id) {
            entries.retain(|(_, id)| id != remote_id);
            if entries.is_empty() {
                in_flight.remove(task_id);
            }
        }
    }

    /// Best-effort `tasks/cancel` for every remote task of `task_id`.
    async fn cancel_remote(&self, task_id: &str) {
        let entries = self.in_flight.lock().await.remove(task_id).unwrap_or_default();
        for (idx, remote_id) in entries {
            let agent = &self.agents[idx];
            let outcome = match agent.client().await {
                Ok(client) => client.cancel_task(&remote_id).await.map(|_| ()),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => tracing::info!("Cancelled remote task {} on {}", remote_id, agent.name),
                Err(e) => tracing::warn!(
                    "Failed to cancel remote task {} on {}: {:#}",
                    remote_id,
                    agent.name,
                    e
                ),
            }
        }
    }
}

fn ensure_not_cancelled(ctx: &RequestContext) -> anyhow::Result<()> {
    if ctx.is_cancelled() {
        anyhow::bail!("Orchestration cancelled");
    }
    Ok(())
}

/// The original message, plus earlier answers once there are any.
pub fn build_instruction(message: &str, previous: &[(String, String)]) -> String {
    if previous.is_empty() {
        return message.to_string();
    }
    let context = previous
        .iter()
        .map(|(name, result)| format!("- {name}: {result}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{message}\n\nPrevious results:\n{context}")
}

/// `"<headline>: a, b"` followed by each agent's answer.
pub fn synthesize(headline: &str, results: &[(String, String)]) -> String {
    let names: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
    let mut out = format!("{headline}: {}", names.join(", "));
    for (name, result) in results {
        out.push_str(&format!("\n\n{name}:\n{result}"));
    }
    out
}

/// True when `review` opens with `marker` as a whole word.
pub fn is_approval(review: &str, marker: &str) -> bool {
    if marker.trim().is_empty() {
        return false;
    }
    let review = review.trim_start_matches(|c: char| !c.is_alphanumeric());
    review
        .strip_prefix(marker)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

fn status_text(task: &Task) -> String {
    task.status
        .message
        .as_ref()
        .map(|m| m.text())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "no details".to_string())
}

#[async_trait]
impl AgentExecutor for OrchestratorExecutor {
    async fn execute(&self, ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<()> {
        queue
            .state(
                ExecutionState::Thinking,
                "Analyzing task and planning agent coordination...",
            )
            .await?;

        match self.orchestrate(ctx, queue).await {
            Ok(result) => {
                queue.text(result).await?;
                queue
                    .state(ExecutionState::Completed, "All sub-agents completed successfully!")
                    .await?;
            }
            Err(e) if ctx.is_cancelled() => {
                tracing::debug!("Orchestration of {} stopped: {:#}", ctx.task_id, e);
            }
            Err(e) => {
                tracing::warn!("Orchestration of {} failed: {:#}", ctx.task_id, e);
                queue
                    .state(ExecutionState::Failed, format!("Orchestration failed: {e:#}"))
                    .await?;
            }
        }
        Ok(())
    }

    async fn cancel(&self, ctx: &RequestContext, queue: &EventQueue) -> anyhow::Result<()> {
        self.cancel_remote(&ctx.task_id).await;
        queue
            .state(ExecutionState::Cancelled, "Orchestration cancelled.")
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprints::test_support::{context, last_state, run, run_cancel, response_text};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn completed_body(text: &str) -> String {
        json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {
                "id": "remote-1",
                "status": {"state": "completed"},
                "artifacts": [{"artifactId": "remote-1-response", "parts": [{"text": text}]}]
            }
        })
        .to_string()
    }

    fn failed_body(reason: &str) -> String {
        json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {
                "id": "remote-2",
                "status": {
                    "state": "failed",
                    "message": {"role": "agent", "parts": [{"text": reason}]}
                }
            }
        })
        .to_string()
    }

    async fn agent_server(body: String) -> mockito::ServerGuard {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/a2a/v1")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        server
    }

    fn sub_agent(name: &str, server: &mockito::ServerGuard) -> SubAgent {
        SubAgent::new(name, server.url(), "", Duration::from_secs(5))
    }

    #[test]
    fn test_strategy_serde() {
        assert_eq!(json!(Strategy::Parallel), json!("parallel"));
        let parsed: Strategy = serde_json::from_value(json!("iterative")).expect("strategy");
        assert_eq!(parsed, Strategy::Iterative);
        assert_eq!(Strategy::default(), Strategy::Sequential);
    }

    #[test]
    fn test_build_instruction_adds_previous_results() {
        assert_eq!(build_instruction("plan a trip", &[]), "plan a trip");
        let previous = vec![("agent_1".to_string(), "flights booked".to_string())];
        assert_eq!(
            build_instruction("plan a trip", &previous),
            "plan a trip\n\nPrevious results:\n- agent_1: flights booked"
        );
    }

    #[test]
    fn test_synthesize() {
        let results = vec![
            ("a".to_string(), "one".to_string()),
            ("b".to_string(), "two".to_string()),
        ];
        assert_eq!(
            synthesize("Orchestration completed. Agents executed", &results),
            "Orchestration completed. Agents executed: a, b\n\na:\none\n\nb:\ntwo"
        );
    }

    #[test]
    fn test_words_skips_short_tokens() {
        assert_eq!(words("Book a flight to Rome!"), vec!["book", "flight", "rome"]);
    }

    #[tokio::test]
    async fn test_no_sub_agents_fails() {
        let executor = OrchestratorExecutor::new(vec![], Strategy::Sequential);
        let (result, events) = run(&executor, &context("anything")).await;
        assert!(result.is_ok());
        assert_eq!(
            last_state(&events),
            Some((
                ExecutionState::Failed,
                Some("Orchestration failed: No sub-agents configured".to_string())
            ))
        );
    }

    #[tokio::test]
    async fn test_sequential_collects_results() {
        let first = agent_server(completed_body("first answer")).await;
        let second = agent_server(completed_body("second answer")).await;
        let executor = OrchestratorExecutor::new(
            vec![sub_agent("agent_1", &first), sub_agent("agent_2", &second)],
            Strategy::Sequential,
        );

        let (_, events) = run(&executor, &context("do it")).await;
        assert_eq!(
            response_text(&events),
            "Orchestration completed. Agents executed: agent_1, agent_2\n\nagent_1:\nfirst answer\n\nagent_2:\nsecond answer"
        );
        assert!(events.iter().any(|e| matches!(
            e,
            crate::a2a::event_queue::ExecutionEvent::Text { text, append: true }
                if text == "\n--- Delegating to agent_2 ---\n"
        )));
        assert_eq!(
            last_state(&events),
            Some((
                ExecutionState::Completed,
                Some("All sub-agents completed successfully!".to_string())
            ))
        );
        assert!(executor.in_flight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_reports_failures() {
        let good = agent_server(completed_body("ok")).await;
        let bad = agent_server(failed_body("boom")).await;
        let executor = OrchestratorExecutor::new(
            vec![sub_agent("good", &good), sub_agent("bad", &bad)],
            Strategy::Parallel,
        );

        let (_, events) = run(&executor, &context("go")).await;
        assert_eq!(
            last_state(&events),
            Some((
                ExecutionState::Failed,
                Some(
                    "Orchestration failed: Some agents failed: bad: bad finished in Failed state: boom"
                        .to_string()
                )
            ))
        );
    }

    #[tokio::test]
    async fn test_conditional_falls_through_to_next_agent() {
        let bad = agent_server(failed_body("nope")).await;
        let good = agent_server(completed_body("handled")).await;
        let executor = OrchestratorExecutor::new(
            vec![sub_agent("first", &bad), sub_agent("second", &good)],
            Strategy::Conditional,
        );

        let (_, events) = run(&executor, &context("unmatched request")).await;
        assert!(response_text(&events).starts_with("Executed agents: first, second\n\nhandled"));
    }

    #[tokio::test]
    async fn test_conditional_selects_by_name() {
        let weather = agent_server(completed_body("sunny")).await;
        let other = agent_server(completed_body("unused")).await;
        let executor = OrchestratorExecutor::new(
            vec![sub_agent("other", &other), sub_agent("weather", &weather)],
            Strategy::Conditional,
        );
        assert_eq!(executor.select_agents("ask weather about Rome").await, vec![1]);
        assert_eq!(executor.select_agents("zzz").await, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_iterative_requires_two_agents() {
        let only = agent_server(completed_body("draft")).await;
        let executor =
            OrchestratorExecutor::new(vec![sub_agent("solo", &only)], Strategy::Iterative);
        let (_, events) = run(&executor, &context("write")).await;
        let (state, description) = last_state(&events).expect("state");
        assert_eq!(state, ExecutionState::Failed);
        assert!(description
            .expect("description")
            .contains("needs a generator and a critic"));
    }

    #[tokio::test]
    async fn test_iterative_stops_on_approval() {
        let generator = agent_server(completed_body("final draft")).await;
        let critic = agent_server(completed_body("APPROVED, looks good")).await;
        let executor = OrchestratorExecutor::new(
            vec![sub_agent("writer", &generator), sub_agent("critic", &critic)],
            Strategy::Iterative,
        );
        let (_, events) = run(&executor, &context("write a haiku")).await;
        assert_eq!(
            response_text(&events),
            "Completed after 1 iterations\n\nfinal draft"
        );
    }

    #[rstest::rstest]
    #[case("APPROVED", true)]
    #[case("APPROVED, looks good", true)]
    #[case("**APPROVED** ship it", true)]
    #[case("NOT APPROVED: the second line is weak", false)]
    #[case("Almost APPROVED", false)]
    #[case("APPROVEDISH", false)]
    #[case("approved", false)]
    fn test_is_approval(#[case] review: &str, #[case] approved: bool) {
        assert_eq!(is_approval(review, "APPROVED"), approved);
    }

    #[test]
    fn test_empty_marker_never_approves() {
        assert!(!is_approval("anything", ""));
        assert!(!is_approval("  ", " "));
    }

    #[tokio::test]
    async fn test_iterative_keeps_going_on_rejection() {
        let generator = agent_server(completed_body("draft")).await;
        let critic = agent_server(completed_body("NOT APPROVED, try again")).await;
        let executor = OrchestratorExecutor::new(
            vec![sub_agent("writer", &generator), sub_agent("critic", &critic)],
            Strategy::Iterative,
        )
        .with_max_iterations(2);
        let (_, events) = run(&executor, &context("write a haiku")).await;
        assert_eq!(response_text(&events), "Completed after 2 iterations

draft");
    }

    #[test]
    fn test_from_config_rejects_empty_marker() {
        let config = OrchestratorConfig {
            approval_marker: "  ".to_string(),
            ..Default::default()
        };
        assert!(OrchestratorExecutor::from_config(&config).is_err());
    }

    /// Sub-agent whose `message/send` answers late; counts `tasks/cancel` calls.
    async fn late_accepting_agent(cancels: Arc<AtomicUsize>) -> String {
        async fn rpc(
            axum::extract::State(cancels): axum::extract::State<Arc<AtomicUsize>>,
            axum::Json(body): axum::Json<serde_json::Value>,
        ) -> axum::Json<serde_json::Value> {
            let state = match body["method"].as_str() {
                Some("message/send") => {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    "submitted"
                }
                Some("tasks/cancel") => {
                    cancels.fetch_add(1, Ordering::SeqCst);
                    "canceled"
                }
                _ => "working",
            };
            axum::Json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": {"id": "remote-1", "status": {"state": state}}
            }))
        }

        let app = axum::Router::new()
            .route("/a2a/v1", axum::routing::post(rpc))
            .with_state(cancels);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("addr"));
        tokio::spawn(async move { axum::serve(listener, app).await });
        url
    }

    #[tokio::test]
    async fn test_cancel_during_submit_still_cancels_remote() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let url = late_accepting_agent(Arc::clone(&cancels)).await;
        let executor = OrchestratorExecutor::new(
            vec![SubAgent::new("late", url, "", Duration::from_secs(5))],
            Strategy::Sequential,
        )
        .with_poll_interval(Duration::from_millis(10));
        let ctx = context("x");

        let ((result, _), cancel_events) = tokio::join!(run(&executor, &ctx), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            ctx.cancellation_token().cancel();
            run_cancel(&executor, &ctx).await
        });

        assert!(result.is_ok());
        assert_eq!(
            last_state(&cancel_events),
            Some((
                ExecutionState::Cancelled,
                Some("Orchestration cancelled.".to_string())
            ))
        );
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(executor.in_flight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_agent_fails() {
        let executor = OrchestratorExecutor::new(
            vec![SubAgent::new(
                "ghost",
                "http://127.0.0.1:1",
                "",
                Duration::from_secs(2),
            )],
            Strategy::Sequential,
        );
        let (_, events) = run(&executor, &context("hello")).await;
        let (state, description) = last_state(&events).expect("state");
        assert_eq!(state, ExecutionState::Failed);
        assert!(description
            .expect("description")
            .starts_with("Orchestration failed: ghost did not accept the task"));
    }

    #[tokio::test]
    async fn test_cancel_without_remote_tasks() {
        let executor = OrchestratorExecutor::new(vec![], Strategy::Sequential);
        let events = run_cancel(&executor, &context("x")).await;
        assert_eq!(
            last_state(&events),
            Some((
                ExecutionState::Cancelled,
                Some("Orchestration cancelled.".to_string())
            ))
        );
    }

    #[tokio::test]
    async fn test_cancel_issues_remote_cancel() {
        let mut server = mockito::Server::new_async().await;
        let cancel = server
            .mock("POST", "/a2a/v1")
            .match_body(mockito::Matcher::PartialJson(json!({"method": "tasks/cancel"})))
            .with_status(200)
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": "1",
                    "result": {"id": "remote-9", "status": {"state": "canceled"}}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let executor =
            OrchestratorExecutor::new(vec![sub_agent("slow", &server)], Strategy::Sequential);
        let ctx = context("x");
        assert!(executor.track(&ctx, 0, "remote-9").await);

        run_cancel(&executor, &ctx).await;
        cancel.assert_async().await;
        assert!(executor.in_flight.lock().await.is_empty());
    }
}
