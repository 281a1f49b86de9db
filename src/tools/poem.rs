//! The `generate_poem` tool: asks the client's model for a poem.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;
use crate::mcp::context::ToolContext;
use crate::mcp::handler::{get_string_arg, success_result, ToolHandler};
use crate::mcp::protocol::{
    ContentBlock, CreateMessageParams, CreateMessageResult, SamplingMessage, Tool, ToolResult,
};

/// Token budget for the generated poem.
pub const POEM_MAX_TOKENS: u32 = 100;

/// Text returned to the caller for a sampling result.
pub fn sampled_text(result: &CreateMessageResult) -> Result<String> {
    match &result.content {
        ContentBlock::Text { text } => Ok(text.clone()),
        other => Ok(serde_json::to_string(other)?),
    }
}

/// Generate poem tool.
pub struct GeneratePoemTool;

impl GeneratePoemTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GeneratePoemTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for GeneratePoemTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "generate_poem".to_string(),
            title: None,
            description: "Generate a poem using LLM sampling.".to_string(),
            input_schema: crate::tool_schema!(required: ["topic"],
                "topic": { "type": "string" }
            ),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>, ctx: &ToolContext) -> Result<ToolResult> {
        let topic = get_string_arg(&args, "topic")?;

        let result = ctx
            .create_message(CreateMessageParams {
                messages: vec![SamplingMessage::user_text(format!(
                    "Write a short poem about {}",
                    topic
                ))],
                max_tokens: POEM_MAX_TOKENS,
                system_prompt: None,
                temperature: None,
            })
            .await?;

        Ok(success_result(sampled_text(&result)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mcp::protocol::Role;
    use serde_json::json;

    fn result(content: ContentBlock) -> CreateMessageResult {
        CreateMessageResult {
            role: Role::Assistant,
            content,
            model: "test".to_string(),
            stop_reason: Some("endTurn".to_string()),
        }
    }

    #[test]
    fn test_sampled_text() {
        let text = result(ContentBlock::Text {
            text: "Roses are red".to_string(),
        });
        assert_eq!(sampled_text(&text).unwrap(), "Roses are red");
    }

    #[test]
    fn test_sampled_non_text_is_rendered() {
        let image = result(ContentBlock::Image {
            data: "aGk=".to_string(),
            mime_type: "image/png".to_string(),
        });
        let rendered = sampled_text(&image).unwrap();
        let value: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value, json!({"type": "image", "data": "aGk=", "mimeType": "image/png"}));
    }

    #[tokio::test]
    async fn test_sampling_needs_client() {
        let mut args = HashMap::new();
        args.insert("topic".to_string(), json!("the sea"));
        let err = GeneratePoemTool::new()
            .execute(args, &ToolContext::detached())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PeerUnavailable));
    }
}
