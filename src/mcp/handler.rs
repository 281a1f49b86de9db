//! Tool handler trait and registry.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mcp::context::ToolContext;
use crate::mcp::protocol::{ContentBlock, Tool, ToolResult};

/// Handler for MCP tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> Tool;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: HashMap<String, Value>, ctx: &ToolContext)
        -> Result<ToolResult>;
}

/// Registry of tool handlers.
pub struct McpHandler {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
}

impl McpHandler {
    /// Create a new handler registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool handler.
    pub fn register<T: ToolHandler + 'static>(&mut self, handler: T) {
        let tool = handler.definition();
        self.tools.insert(tool.name.clone(), Arc::new(handler));
    }

    /// Get all registered tools, sorted by name.
    pub fn list_tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.values().map(|h| h.definition()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for McpHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper macro for creating tool input schemas.
#[macro_export]
macro_rules! tool_schema {
    (required: [$($req:expr),* $(,)?], $($json:tt)+) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $($json)+
            },
            "required": [$($req),*]
        })
    };
}

/// Helper to create a text content block.
pub fn text_content(text: impl Into<String>) -> ContentBlock {
    ContentBlock::Text { text: text.into() }
}

/// Helper to create a successful tool result.
pub fn success_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        is_error: false,
    }
}

/// Helper to create an error tool result.
pub fn error_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        is_error: true,
    }
}

/// Successful result with no content.
pub fn empty_result() -> ToolResult {
    ToolResult {
        content: Vec::new(),
        is_error: false,
    }
}

fn missing(name: &str) -> Error {
    Error::InvalidToolArguments(format!("Missing required argument: {}", name))
}

/// Helper to extract a required string argument.
pub fn get_string_arg(args: &HashMap<String, Value>, name: &str) -> Result<String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| missing(name))
}

/// Helper to extract an optional string argument.
pub fn get_optional_string_arg(args: &HashMap<String, Value>, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(String::from)
}

/// Helper to extract a required integer argument.
pub fn get_int_arg(args: &HashMap<String, Value>, name: &str) -> Result<i64> {
    match args.get(name) {
        None | Some(Value::Null) => Err(missing(name)),
        Some(v) => v.as_i64().ok_or_else(|| {
            Error::InvalidToolArguments(format!("Argument {} must be an integer", name))
        }),
    }
}

/// Helper to extract an optional integer argument with a default.
pub fn get_int_arg_or(args: &HashMap<String, Value>, name: &str, default: i64) -> Result<i64> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(_) => get_int_arg(args, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestTool {
        name: String,
    }

    #[async_trait]
    impl ToolHandler for TestTool {
        fn definition(&self) -> Tool {
            Tool {
                name: self.name.clone(),
                title: None,
                description: format!("Test tool: {}", self.name),
                input_schema: crate::tool_schema!(required: ["input"],
                    "input": { "type": "string" }
                ),
            }
        }

        async fn execute(
            &self,
            args: HashMap<String, Value>,
            _ctx: &ToolContext,
        ) -> Result<ToolResult> {
            let input = get_optional_string_arg(&args, "input").unwrap_or_default();
            Ok(success_result(format!(
                "Executed {} with: {}",
                self.name, input
            )))
        }
    }

    #[test]
    fn test_handler_registration() {
        let mut handler = McpHandler::new();
        handler.register(TestTool {
            name: "test_tool".to_string(),
        });

        assert_eq!(handler.tool_count(), 1);
        assert!(handler.has_tool("test_tool"));
        assert!(!handler.has_tool("nonexistent"));
    }

    #[test]
    fn test_handler_list_tools_sorted() {
        let mut handler = McpHandler::new();
        handler.register(TestTool {
            name: "tool_b".to_string(),
        });
        handler.register(TestTool {
            name: "tool_a".to_string(),
        });

        let names: Vec<_> = handler.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["tool_a", "tool_b"]);
    }

    #[test]
    fn test_tool_schema_macro() {
        let tool = TestTool {
            name: "x".to_string(),
        }
        .definition();
        assert_eq!(tool.input_schema["type"], "object");
        assert_eq!(tool.input_schema["required"], json!(["input"]));
        assert_eq!(tool.input_schema["properties"]["input"]["type"], "string");
    }

    #[test]
    fn test_tool_execution() {
        let mut handler = McpHandler::new();
        handler.register(TestTool {
            name: "echo".to_string(),
        });

        let tool = handler.get_tool("echo").unwrap();
        let mut args = HashMap::new();
        args.insert("input".to_string(), json!("hello"));

        let ctx = ToolContext::detached();
        let result = tokio_test::block_on(tool.execute(args, &ctx)).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content[0], text_content("Executed echo with: hello"));
    }

    #[test]
    fn test_get_string_arg() {
        let mut args = HashMap::new();
        args.insert("name".to_string(), json!("value"));

        assert_eq!(get_string_arg(&args, "name").unwrap(), "value");
        assert!(get_string_arg(&args, "missing").is_err());
        assert_eq!(get_optional_string_arg(&args, "missing"), None);
    }

    #[test]
    fn test_get_int_arg() {
        let mut args = HashMap::new();
        args.insert("count".to_string(), json!(42));
        args.insert("word".to_string(), json!("four"));

        assert_eq!(get_int_arg(&args, "count").unwrap(), 42);
        assert!(get_int_arg(&args, "missing").is_err());
        assert!(get_int_arg(&args, "word").is_err());
        assert_eq!(get_int_arg_or(&args, "missing", 5).unwrap(), 5);
        assert_eq!(get_int_arg_or(&args, "count", 5).unwrap(), 42);
        assert!(get_int_arg_or(&args, "word", 5).is_err());
    }

    #[test]
    fn test_result_helpers() {
        assert!(!success_result("ok").is_error);
        assert!(error_result("bad").is_error);
        let empty = empty_result();
        assert!(empty.content.is_empty());
        assert!(!empty.is_error);
    }
}
