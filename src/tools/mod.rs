//! Tool System
//!
//! Tools are named async functions with a JSON parameter schema. The
//! [`ToolRegistry`] maps names to tools for keyword routing and for exposing
//! function-calling schemas to a model provider.

pub mod error;
mod r#trait;
pub mod registry;

pub mod convert;
pub mod file;
pub mod math;
pub mod samples;
pub mod text;
pub mod time;
pub mod web;

pub use error::{Result, ToolError};
pub use r#trait::{Tool, ToolCategory, ToolResult};
pub use registry::ToolRegistry;
