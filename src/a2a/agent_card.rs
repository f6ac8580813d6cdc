//! Agent Card generation for `.well-known/agent.json`.
//!
//! Each blueprint publishes a static card. Tool-based blueprints derive one
//! skill per tool category from the registry.

use crate::a2a::client::RPC_PATH;
use crate::a2a::types::*;
use crate::blueprints::Blueprint;
use crate::config::{AgentConfig, ServerConfig, ToolsConfig};
use crate::tools::{ToolCategory, ToolRegistry};
use std::collections::HashSet;
use thiserror::Error;

const TEXT_MODES: &[&str] = &["text/plain"];

/// Where the card says the agent lives, plus configured overrides.
#[derive(Debug, Clone)]
pub struct CardSettings {
    pub base_url: String,
    pub agent: AgentConfig,
    pub tools: ToolsConfig,
}

impl CardSettings {
    /// `public_url` when set, otherwise `http://{host}:{port}`. A wildcard
    /// bind address is advertised as `localhost`.
    pub fn new(server: &ServerConfig, agent: &AgentConfig, port: u16) -> Self {
        let base_url = match &server.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let host = match server.host.as_str() {
                    "0.0.0.0" | "::" | "[::]" => "localhost",
                    other => other,
                };
                format!("http://{}:{}", host, port)
            }
        };
        Self {
            base_url,
            agent: agent.clone(),
            tools: ToolsConfig::default(),
        }
    }

    /// Advertise the tools `tools` enables.
    pub fn with_tools(mut self, tools: &ToolsConfig) -> Self {
        self.tools = tools.clone();
        self
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CardError {
    #[error("Agent card name must not be empty")]
    EmptyName,
    #[error("Agent card must declare at least one skill")]
    NoSkills,
    #[error("Skill #{0} has an empty id")]
    EmptySkillId(usize),
    #[error("Duplicate skill id '{0}'")]
    DuplicateSkillId(String),
}

/// Build the Agent Card for a blueprint.
pub fn build_agent_card(blueprint: Blueprint, settings: &CardSettings) -> AgentCard {
    let (name, description, skills) = match blueprint {
        Blueprint::Simple => (
            "Simple Agent",
            "A simple A2A agent that demonstrates basic message handling patterns.",
            vec![skill(
                "simple_response",
                "Simple Response",
                "Responds to user messages with helpful information.",
                &["response", "simple"],
                &[
                    "Hello, how can you help me?",
                    "What can you do?",
                    "Tell me something interesting",
                ],
            )],
        ),
        Blueprint::Streaming => (
            "Streaming Agent",
            "An A2A agent that streams its reply incrementally.",
            vec![skill(
                "streaming_response",
                "Streaming Response",
                "Streams a reply word by word.",
                &["response", "streaming"],
                &["Hello, stream me a reply"],
            )],
        ),
        Blueprint::ToolUsing => (
            "Tool-Using Agent",
            "An A2A agent that uses tools to accomplish tasks.",
            tool_skills(&ToolRegistry::from_config(&settings.tools)),
        ),
        Blueprint::LlmTools => (
            "LLM Tool-Using Agent",
            "An A2A agent that lets a language model choose which tool to call.",
            tool_skills(&ToolRegistry::from_config(&settings.tools)),
        ),
        Blueprint::Orchestrator => (
            "Multi-Agent Orchestrator",
            "An orchestrator agent that coordinates multiple specialized agents to accomplish complex tasks.",
            vec![
                skill(
                    "orchestrated_task_1",
                    "Orchestrated Task 1",
                    "Handles complex task 1 by coordinating multiple specialized agents.",
                    &["orchestration", "multi-agent"],
                    &["Perform complex task 1", "Execute workflow 1"],
                ),
                skill(
                    "orchestrated_task_2",
                    "Orchestrated Task 2",
                    "Handles complex task 2 by coordinating multiple specialized agents.",
                    &["orchestration", "multi-agent"],
                    &["Perform complex task 2", "Execute workflow 2"],
                ),
            ],
        ),
    };

    let overrides = &settings.agent;
    AgentCard {
        name: overrides.name.clone().unwrap_or_else(|| name.to_string()),
        description: Some(
            overrides
                .description
                .clone()
                .unwrap_or_else(|| description.to_string()),
        ),
        version: Some(
            overrides
                .version
                .clone()
                .unwrap_or_else(|| crate::VERSION.to_string()),
        ),
        documentation_url: None,
        icon_url: None,
        supported_interfaces: vec![SupportedInterface {
            url: format!("{}{}", settings.base_url, RPC_PATH),
            protocol_binding: "JSONRPC".to_string(),
            protocol_version: Some("1.0".to_string()),
        }],
        provider: Some(AgentProvider {
            organization: "A2A Blueprints".to_string(),
            url: None,
        }),
        capabilities: Some(AgentCapabilities {
            streaming: true,
            push_notifications: false,
            state_transition_history: false,
        }),
        skills,
        default_input_modes: strings(TEXT_MODES),
        default_output_modes: strings(TEXT_MODES),
        supports_authenticated_extended_card: false,
    }
}

/// Reject cards other agents could not use.
pub fn validate_card(card: &AgentCard) -> Result<(), CardError> {
    if card.name.trim().is_empty() {
        return Err(CardError::EmptyName);
    }
    if card.skills.is_empty() {
        return Err(CardError::NoSkills);
    }
    let mut seen = HashSet::new();
    for (i, s) in card.skills.iter().enumerate() {
        if s.id.trim().is_empty() {
            return Err(CardError::EmptySkillId(i));
        }
        if !seen.insert(s.id.as_str()) {
            return Err(CardError::DuplicateSkillId(s.id.clone()));
        }
    }
    Ok(())
}

fn tool_skills(registry: &ToolRegistry) -> Vec<AgentSkill> {
    registry
        .categories()
        .into_iter()
        .map(|category| category_skill(registry, category))
        .collect()
}

fn category_skill(registry: &ToolRegistry, category: ToolCategory) -> AgentSkill {
    let tools = registry.by_category(category);
    let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
    let mut title = category.as_str().to_string();
    if let Some(first) = title.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    AgentSkill {
        id: format!("{category}_tools"),
        name: format!("{title} Tools"),
        description: Some(format!("Tools: {}", names.join(", "))),
        tags: vec!["tool".to_string(), category.to_string()],
        examples: tools.iter().flat_map(|t| t.examples()).collect(),
        input_modes: vec![],
        output_modes: vec![],
    }
}

fn skill(id: &str, name: &str, description: &str, tags: &[&str], examples: &[&str]) -> AgentSkill {
    AgentSkill {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        tags: strings(tags),
        examples: strings(examples),
        input_modes: vec![],
        output_modes: vec![],
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
