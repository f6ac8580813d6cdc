//! File read/write tools, confined to a configured root directory.
//!
//! Paths are relative to the root. Absolute paths and `..` components are
//! rejected as invalid input; IO failures are soft failures so the agent
//! can relay them.

use super::error::{Result, ToolError};
use super::r#trait::{Tool, ToolCategory, ToolResult, required_str};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::{Component, Path, PathBuf};

/// Join `path` onto `root`, refusing anything that could leave it.
pub fn resolve_path(root: &Path, path: &str) -> Result<PathBuf> {
    let relative = Path::new(path);
    if path.trim().is_empty() {
        return Err(ToolError::InvalidInput("'path' must not be empty".to_string()));
    }
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(ToolError::InvalidInput(format!(
                    "'{path}' must not contain '..'"
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ToolError::InvalidInput(format!(
                    "'{path}' must be relative to the tool root"
                )));
            }
        }
    }
    Ok(root.join(relative))
}

pub struct ReadFileTool {
    root: PathBuf,
}

impl ReadFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read contents of a file"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::File
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File path relative to the tool root"}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let path = required_str(&input, "path")?;
        let full = resolve_path(&self.root, path)?;
        match tokio::fs::read_to_string(&full).await {
            Ok(content) => Ok(ToolResult::success(json!({
                "path": path,
                "size": content.len(),
                "content": content,
            }))),
            Err(e) => {
                tracing::warn!("read_file failed for {}: {}", full.display(), e);
                Ok(ToolResult::failure(json!({
                    "path": path,
                    "error": e.to_string(),
                })))
            }
        }
    }
}

pub struct WriteFileTool {
    root: PathBuf,
}

impl WriteFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::File
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File path relative to the tool root"},
                "content": {"type": "string", "description": "Content to write"}
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let path = required_str(&input, "path")?;
        let content = required_str(&input, "content")?;
        let full = resolve_path(&self.root, path)?;
        match tokio::fs::write(&full, content).await {
            Ok(()) => Ok(ToolResult::success(json!({
                "path": path,
                "bytes_written": content.len(),
            }))),
            Err(e) => {
                tracing::warn!("write_file failed for {}: {}", full.display(), e);
                Ok(ToolResult::failure(json!({
                    "path": path,
                    "error": e.to_string(),
                })))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().expect("tempdir");

        let written = WriteFileTool::new(dir.path())
            .execute(json!({"path": "note.txt", "content": "hello"}))
            .await
            .expect("write");
        assert!(written.success);
        assert_eq!(written.output["bytes_written"], 5);
        assert!(dir.path().join("note.txt").exists());

        let read = ReadFileTool::new(dir.path())
            .execute(json!({"path": "./note.txt"}))
            .await
            .expect("read");
        assert!(read.success);
        assert_eq!(read.output["content"], "hello");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_soft_failure() {
        let dir = TempDir::new().expect("tempdir");
        let result = ReadFileTool::new(dir.path())
            .execute(json!({"path": "missing.txt"}))
            .await
            .expect("result");
        assert!(!result.success);
        assert!(result.output["error"].is_string());
    }

    #[rstest]
    #[case("/etc/passwd")]
    #[case("../outside.txt")]
    #[case("nested/../../outside.txt")]
    #[case("")]
    #[tokio::test]
    async fn test_paths_outside_root_are_rejected(#[case] path: &str) {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().join("root");
        std::fs::create_dir(&root).expect("root");

        let read = ReadFileTool::new(&root).execute(json!({"path": path})).await;
        assert!(matches!(read, Err(ToolError::InvalidInput(_))));

        let write = WriteFileTool::new(&root)
            .execute(json!({"path": path, "content": "x"}))
            .await;
        assert!(matches!(write, Err(ToolError::InvalidInput(_))));
        assert!(!dir.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn test_old_argument_name_is_not_accepted() {
        let dir = TempDir::new().expect("tempdir");
        let result = ReadFileTool::new(dir.path())
            .execute(json!({"filepath": "note.txt"}))
            .await;
        assert!(matches!(result, Err(ToolError::InvalidInput(_))));
    }
}
