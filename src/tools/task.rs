//! The `long_running_task` tool: a task that reports progress as it goes.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;
use crate::mcp::context::ToolContext;
use crate::mcp::handler::{get_int_arg_or, get_string_arg, success_result, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};

/// Steps run when the caller does not say.
pub const DEFAULT_STEPS: i64 = 5;

/// Long running task tool.
pub struct LongRunningTaskTool;

impl LongRunningTaskTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LongRunningTaskTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for LongRunningTaskTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "long_running_task".to_string(),
            title: None,
            description: "Execute a task with progress updates.".to_string(),
            input_schema: crate::tool_schema!(required: ["task_name"],
                "task_name": { "type": "string" },
                "steps": { "type": "integer", "default": DEFAULT_STEPS }
            ),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>, ctx: &ToolContext) -> Result<ToolResult> {
        let task_name = get_string_arg(&args, "task_name")?;
        let steps = get_int_arg_or(&args, "steps", DEFAULT_STEPS)?;

        ctx.info(format!("Starting: {}", task_name)).await;

        for i in 1..=steps {
            ctx.report_progress(
                i as f64 / steps as f64,
                Some(1.0),
                Some(&format!("Step {}/{}", i, steps)),
            )
            .await;
            ctx.info(format!("Completed step {}", i)).await;
        }

        Ok(success_result(format!("Task '{}' completed", task_name)))
    }
}
