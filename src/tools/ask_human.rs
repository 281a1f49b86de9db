//! The `ask_human` tool: put a question in front of the human.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::dialog::{DialogRequest, InputDialog};
use crate::error::Result;
use crate::mcp::context::ToolContext;
use crate::mcp::handler::{empty_result, get_string_arg, success_result, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::metrics::Metrics;

/// Window layout shared by every question.
#[derive(Debug, Clone)]
pub struct DialogLayout {
    pub title: String,
    pub width: u32,
    pub padding: u32,
}

impl Default for DialogLayout {
    fn default() -> Self {
        Self {
            title: crate::dialog::DEFAULT_TITLE.to_string(),
            width: crate::dialog::DEFAULT_WIDTH,
            padding: crate::dialog::DEFAULT_PADDING,
        }
    }
}

/// Ask human tool.
pub struct AskHumanTool {
    dialog: Arc<dyn InputDialog>,
    layout: DialogLayout,
    metrics: Arc<Metrics>,
}

impl AskHumanTool {
    pub fn new(dialog: Arc<dyn InputDialog>, layout: DialogLayout, metrics: Arc<Metrics>) -> Self {
        Self {
            dialog,
            layout,
            metrics,
        }
    }
}

#[async_trait]
impl ToolHandler for AskHumanTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "ask_human".to_string(),
            title: Some("Ask Human".to_string()),
            description: "Ask human for certain information. Especially when you don't know what you are going to do next".to_string(),
            input_schema: crate::tool_schema!(required: ["query"],
                "query": {
                    "type": "string",
                    "description": "The question to ask the human user"
                }
            ),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>, _ctx: &ToolContext) -> Result<ToolResult> {
        let query = get_string_arg(&args, "query")?;

        let request = DialogRequest::new(query)
            .with_title(self.layout.title.clone())
            .with_width(self.layout.width)
            .with_padding(self.layout.padding);

        let answer = self.dialog.prompt(&request).await?;
        self.metrics.record_dialog(answer.is_some());

        match answer {
            Some(text) => Ok(success_result(text)),
            None => {
                info!("Human dismissed the question");
                Ok(empty_result())
            }
        }
    }
}
