//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! 1. compiled-in defaults
//! 2. `~/.a2a-blueprints/config.toml` (or the file passed with `--config`)
//! 3. `A2A_`-prefixed environment variables, `__` between sections
//!    (`A2A_SERVER__PORT=8080`)
//! 4. the bare variables the blueprints have always honored: `PORT`,
//!    `LOG_LEVEL`, provider API keys and `AGENT_<n>_URL`
//!
//! CLI flags are applied on top by the binary.

use crate::blueprints::orchestrator::Strategy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub agent: AgentConfig,
    pub llm: LlmConfig,
    pub streaming: StreamingConfig,
    pub orchestrator: OrchestratorConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Unset means the blueprint's default port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Externally reachable base URL advertised in the agent card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: None,
            public_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`.
    pub level: String,
    pub json: bool,
    /// Directory for daily-rolling log files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Overrides for the agent card's identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API root.
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub chunk_delay_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self { chunk_delay_ms: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub strategy: Strategy,
    pub max_iterations: usize,
    /// Critic replies containing this marker end the iterative loop.
    pub approval_marker: String,
    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub sub_agents: Vec<SubAgentConfig>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Sequential,
            max_iterations: 3,
            approval_marker: "APPROVED".to_string(),
            request_timeout_secs: 120,
            poll_interval_ms: 250,
            sub_agents: (1..=3)
                .map(|n| SubAgentConfig {
                    name: format!("agent_{n}"),
                    url: format!("http://localhost:{}", 10000 + n),
                    description: String::new(),
                })
                .collect(),
        }
    }
}

/// Tools that touch the host are off unless configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Directory `read_file`/`write_file` are confined to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAgentConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

impl Config {
    /// Load from the default file location and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, std::env::vars().collect())
    }

    /// Load with an explicit environment map.
    pub fn load_with_env(path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?);

        builder = match path {
            Some(p) => builder.add_source(config::File::from(p).required(true)),
            None => match default_config_path() {
                Some(p) => builder.add_source(config::File::from(p).required(false)),
                None => builder,
            },
        };

        let prefixed: HashMap<String, String> = env
            .iter()
            .filter(|(k, _)| k.starts_with("A2A_"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        builder = builder.add_source(
            config::Environment::with_prefix("A2A")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(prefixed)),
        );

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.apply_bare_env(&env)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_bare_env(&mut self, env: &HashMap<String, String>) -> Result<()> {
        if let Some(port) = env.get("PORT") {
            let port = port
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid(format!("PORT={port}: {e}")))?;
            self.server.port = Some(port);
        }
        if let Some(level) = env.get("LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = ["OPENAI_API_KEY", "ANTHROPIC_API_KEY", "GOOGLE_API_KEY"]
                .iter()
                .find_map(|k| env.get(*k).filter(|v| !v.is_empty()).cloned());
        }

        let mut numbered: Vec<(usize, &String)> = env
            .iter()
            .filter_map(|(k, v)| {
                let n = k.strip_prefix("AGENT_")?.strip_suffix("_URL")?;
                Some((n.parse::<usize>().ok()?, v))
            })
            .collect();
        numbered.sort_by_key(|(n, _)| *n);
        for (n, url) in numbered {
            let name = format!("agent_{n}");
            match self
                .orchestrator
                .sub_agents
                .iter_mut()
                .find(|a| a.name == name)
            {
                Some(agent) => agent.url = url.clone(),
                None => self.orchestrator.sub_agents.push(SubAgentConfig {
                    name,
                    url: url.clone(),
                    description: String::new(),
                }),
            }
        }
        Ok(())
    }

    /// Effective configuration as TOML, with the API key masked.
    pub fn to_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.llm.api_key.is_some() {
            shown.llm.api_key = Some("***".to_string());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }

    fn validate(&self) -> Result<()> {
        if self.orchestrator.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "orchestrator.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.orchestrator.approval_marker.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "orchestrator.approval_marker must not be empty".to_string(),
            ));
        }
        for agent in &self.orchestrator.sub_agents {
            if !agent.url.starts_with("http://") && !agent.url.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "sub-agent {} has a non-HTTP url: {}",
                    agent.name, agent.url
                )));
            }
        }
        Ok(())
    }
}

/// `~/.a2a-blueprints/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".a2a-blueprints").join("config.toml"))
}
