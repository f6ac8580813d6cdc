//! Copy-and-customize A2A agent blueprints.
//!
//! Each [`blueprints::Blueprint`] pairs an [`a2a::AgentExecutor`] with an
//! agent card and is served by the shared JSON-RPC server in [`a2a::server`].

pub mod a2a;
pub mod blueprints;
pub mod cli;
pub mod config;
pub mod llm;
pub mod logging;
pub mod tools;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::Config;

/// Crate version, advertised on agent cards and `/a2a/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
