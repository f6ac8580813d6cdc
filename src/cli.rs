//! CLI command definitions and handlers

use crate::a2a::agent_card::{self, CardSettings};
use crate::a2a::client::A2aClient;
use crate::a2a::server;
use crate::blueprints::{Blueprint, Strategy};
use crate::config::Config;
use crate::tools::ToolRegistry;
use clap::{Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

/// A2A agent blueprints
///
/// Serve one of the ready-made agents, inspect its card, or talk to any
/// A2A agent from the terminal.
#[derive(Parser, Debug)]
#[command(name = "a2a-blueprints")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.a2a-blueprints/config.toml)
    #[arg(long, global = true, env = "A2A_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level or EnvFilter directive
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a blueprint agent over A2A JSON-RPC
    Serve(ServeArgs),

    /// Print a blueprint's agent card
    Card(CardArgs),

    /// List the built-in tools by category
    Tools,

    /// Send a message to an A2A agent and print the reply
    Send(SendArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(value_enum)]
    pub blueprint: Blueprint,

    /// Bind address
    #[arg(long)]
    pub host: Option<String>,

    /// Port (default: 9999, orchestrator 10000)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Base URL advertised in the agent card
    #[arg(long)]
    pub public_url: Option<String>,

    /// Orchestration strategy
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,
}

#[derive(Args, Debug)]
pub struct CardArgs {
    #[arg(value_enum)]
    pub blueprint: Blueprint,

    /// Port the card should advertise
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Agent base URL, e.g. http://localhost:9999
    pub url: String,

    pub message: String,

    /// Bearer token
    #[arg(long, env = "A2A_TOKEN")]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,
}

impl Cli {
    /// Apply flag overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.to_lowercase();
        }
        if self.log_json {
            config.logging.json = true;
        }
        if let Command::Serve(args) = &self.command {
            args.apply(config);
        }
    }
}

impl ServeArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = Some(port);
        }
        if let Some(url) = &self.public_url {
            config.server.public_url = Some(url.clone());
        }
        if let Some(strategy) = self.strategy {
            config.orchestrator.strategy = strategy;
        }
    }
}

pub async fn execute(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => server::start_server(args.blueprint, &config).await,
        Command::Card(args) => {
            let port = args
                .port
                .or(config.server.port)
                .unwrap_or_else(|| args.blueprint.default_port());
            let settings =
                CardSettings::new(&config.server, &config.agent, port).with_tools(&config.tools);
            let card = agent_card::build_agent_card(args.blueprint, &settings);
            println!("{}", serde_json::to_string_pretty(&card)?);
            Ok(())
        }
        Command::Tools => {
            print!("{}", render_tools(&ToolRegistry::from_config(&config.tools)));
            Ok(())
        }
        Command::Send(args) => send(args).await,
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn send(args: SendArgs) -> anyhow::Result<()> {
    let mut client =
        A2aClient::new(&args.url).with_timeout(Duration::from_secs(args.timeout_secs))?;
    if let Some(token) = args.token {
        client = client.with_token(token);
    }

    match client.get_agent_card().await {
        Ok(card) => {
            println!(
                "Connected to {} ({})",
                card.name,
                card.version.as_deref().unwrap_or("unknown version")
            );
            if let Some(url) = card.jsonrpc_url() {
                client = client.with_rpc_url(url);
            }
        }
        Err(e) => tracing::warn!(
            "Could not fetch agent card from {}: {:#}. Using {}",
            args.url,
            e,
            client.rpc_url()
        ),
    }

    let task = client.send_text(args.message).await?;
    let output = task.output_text();
    if output.is_empty() {
        if let Some(message) = &task.status.message {
            println!("{}", message.text());
        }
    } else {
        println!("{output}");
    }
    let state = serde_json::to_value(task.status.state)?;
    println!("\nState: {}", state.as_str().unwrap_or_default());
    Ok(())
}

/// Tools grouped by category, one per line.
pub fn render_tools(registry: &ToolRegistry) -> String {
    let mut out = String::new();
    for category in registry.categories() {
        let _ = writeln!(out, "{category}:");
        for tool in registry.by_category(category) {
            let _ = writeln!(out, "  {:<18} {}", tool.name(), tool.description());
        }
    }
    out
}
