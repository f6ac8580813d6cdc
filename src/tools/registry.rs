//! Tool registry: name → tool lookup and invocation.

use super::error::{Result, ToolError};
use super::r#trait::{Tool, ToolCategory, ToolResult};
use crate::config::ToolsConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with every built-in tool that needs no host access.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::samples::ExampleTool1));
        registry.register(Arc::new(super::samples::ExampleTool2));
        registry.register(Arc::new(super::samples::ApiCallTool));
        registry.register(Arc::new(super::math::RollDiceTool));
        registry.register(Arc::new(super::math::IsPrimeTool));
        registry.register(Arc::new(super::math::CalculateTool));
        registry.register(Arc::new(super::time::CurrentTimeTool));
        registry.register(Arc::new(super::text::AnalyzeTextTool));
        registry.register(Arc::new(super::text::ReverseTextTool));
        registry.register(Arc::new(super::convert::ConvertUnitsTool));
        registry.register(Arc::new(super::web::FetchWeatherTool));
        registry.register(Arc::new(super::web::SearchWebTool));
        registry
    }

    /// Built-in tools, plus the file tools when `file_root` is configured.
    pub fn from_config(config: &ToolsConfig) -> Self {
        let mut registry = Self::with_builtin();
        if let Some(root) = &config.file_root {
            registry.register_file_tools(root);
        }
        registry
    }

    /// Register `read_file` and `write_file`, confined to `root`.
    pub fn register_file_tools(&mut self, root: &Path) {
        tracing::info!("File tools enabled under {}", root.display());
        self.register(Arc::new(super::file::ReadFileTool::new(root)));
        self.register(Arc::new(super::file::WriteFileTool::new(root)));
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!("Replaced tool '{}'", name);
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names, sorted.
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn description(&self, name: &str) -> Result<String> {
        self.get(name).map(|t| t.description().to_string())
    }

    /// Tools in one category, sorted by name.
    pub fn by_category(&self, category: ToolCategory) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = self
            .tools
            .values()
            .filter(|t| t.category() == category)
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    pub fn categories(&self) -> Vec<ToolCategory> {
        let mut categories: Vec<ToolCategory> = self.tools.values().map(|t| t.category()).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub async fn invoke(&self, name: &str, input: Value) -> Result<ToolResult> {
        let tool = self.get(name)?;
        tracing::debug!("Invoking tool '{}' with {}", name, input);
        tool.execute(input).await
    }

    /// OpenAI-style function schema for one tool.
    pub fn function_schema(&self, name: &str) -> Result<Value> {
        let tool = self.get(name)?;
        Ok(serde_json::json!({
            "name": tool.name(),
            "description": tool.description(),
            "parameters": tool.input_schema(),
        }))
    }

    /// Function schemas for every tool, sorted by name.
    pub fn function_schemas(&self) -> Vec<Value> {
        self.list_tools()
            .iter()
            .filter_map(|name| self.function_schema(name).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_lists_sorted() {
        let registry = ToolRegistry::with_builtin();
        let names = registry.list_tools();
        assert_eq!(names.len(), 12);
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(registry.contains("roll_dice"));
        assert!(registry.contains("tool_example_1"));
        assert!(!registry.contains("read_file"));
    }

    #[test]
    fn test_file_tools_need_a_root() {
        let registry = ToolRegistry::from_config(&ToolsConfig::default());
        assert!(!registry.contains("read_file"));
        assert!(!registry.contains("write_file"));

        let registry = ToolRegistry::from_config(&ToolsConfig {
            file_root: Some(std::env::temp_dir()),
        });
        assert_eq!(registry.len(), 14);
        assert!(registry.contains("read_file"));
        assert!(registry.categories().contains(&ToolCategory::File));
    }

    #[test]
    fn test_get_unknown_tool() {
        let registry = ToolRegistry::with_builtin();
        let err = registry.get("nope").err().expect("error");
        assert_eq!(err.to_string(), "Tool 'nope' not found");
    }

    #[test]
    fn test_categories_deduplicated() {
        let registry = ToolRegistry::with_builtin();
        let categories = registry.categories();
        assert_eq!(
            categories,
            vec![
                ToolCategory::Example,
                ToolCategory::Math,
                ToolCategory::Time,
                ToolCategory::Text,
                ToolCategory::Conversion,
                ToolCategory::Api,
            ]
        );
        let math: Vec<String> = registry
            .by_category(ToolCategory::Math)
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(math, vec!["calculate", "is_prime", "roll_dice"]);
    }

    #[test]
    fn test_function_schema_marks_required() {
        let registry = ToolRegistry::with_builtin();
        let schema = registry.function_schema("tool_example_1").expect("schema");
        assert_eq!(schema["name"], "tool_example_1");
        assert_eq!(schema["parameters"]["type"], "object");
        assert_eq!(schema["parameters"]["required"], serde_json::json!(["param1"]));
        assert_eq!(registry.function_schemas().len(), registry.len());
    }

    #[tokio::test]
    async fn test_invoke_dispatches_by_name() {
        let registry = ToolRegistry::with_builtin();
        let result = registry
            .invoke("reverse_text", serde_json::json!({"text": "abc"}))
            .await
            .expect("result");
        assert_eq!(result.output, serde_json::json!("cba"));
    }
}
