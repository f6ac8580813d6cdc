//! A2A (Agent-to-Agent) protocol plumbing shared by every blueprint.
//!
//! - Agent Card discovery (`.well-known/agent.json`)
//! - JSON-RPC 2.0 task API (`message/send`, `message/stream`, `tasks/get`, `tasks/cancel`)
//! - executor seam and event queue the blueprints plug into
//! - HTTP server (axum) and a small client for talking to other agents

pub mod agent_card;
pub mod client;
pub mod error;
pub mod event_queue;
pub mod executor;
pub mod handler;
pub mod server;
pub mod types;

pub use client::A2aClient;
pub use error::A2aError;
pub use event_queue::{EventQueue, ExecutionEvent, ExecutionState};
pub use executor::{AgentExecutor, RequestContext};
pub use handler::TaskManager;
