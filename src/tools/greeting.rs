//! The `greeting://{name}` resource and the `greet_user` prompt.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mcp::prompts::{Prompt, PromptArgument, PromptRegistry};
use crate::mcp::resources::{ResourceRegistry, ResourceTemplate};

pub const GREETING_TEMPLATE: &str = "greeting://{name}";
pub const GREET_PROMPT: &str = "greet_user";

/// Styles offered for `greet_user`; the first is the default.
pub const GREETING_STYLES: &[&str] = &["friendly", "formal", "casual"];

/// Text of the greeting resource.
pub fn greeting(name: &str) -> String {
    format!("Hello, {}!", name)
}

fn style_phrase(style: &str) -> &'static str {
    match style {
        "formal" => "Please write a formal, professional greeting",
        "casual" => "Please write a casual, relaxed greeting",
        _ => "Please write a warm, friendly greeting",
    }
}

/// Render the `greet_user` prompt text.
pub fn greet_prompt(args: &HashMap<String, String>) -> String {
    let name = args.get("name").map(String::as_str).unwrap_or_default();
    let style = args
        .get("style")
        .map(String::as_str)
        .unwrap_or(GREETING_STYLES[0]);
    format!("{} for someone named {}.", style_phrase(style), name)
}

pub fn register_resources(registry: &mut ResourceRegistry) -> Result<()> {
    registry.register_template(
        ResourceTemplate {
            uri_template: GREETING_TEMPLATE.to_string(),
            name: "get_greeting".to_string(),
            description: Some("Get a personalized greeting".to_string()),
            mime_type: Some("text/plain".to_string()),
        },
        |bindings| {
            let name = bindings
                .get("name")
                .ok_or_else(|| Error::InvalidParams("Missing name".to_string()))?;
            Ok(greeting(name))
        },
    )
}

pub fn register_prompts(registry: &mut PromptRegistry) {
    registry.register(
        Prompt {
            name: GREET_PROMPT.to_string(),
            description: "Generate a greeting prompt".to_string(),
            arguments: vec![
                PromptArgument {
                    name: "name".to_string(),
                    description: Some("Name of the person to greet".to_string()),
                    required: true,
                },
                PromptArgument {
                    name: "style".to_string(),
                    description: Some("friendly, formal or casual".to_string()),
                    required: false,
                },
            ],
        },
        greet_prompt,
    );
    registry.set_completions(GREET_PROMPT, "style", GREETING_STYLES);
}
