//! MCP Prompt Templates
//!
//! Prompts are registered with a renderer that turns the caller's arguments
//! into the text of a single user message.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mcp::protocol::Role;

/// A prompt argument definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
}

/// A prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A prompt message (the actual content).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: PromptContent,
}

/// Prompt content types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptContent {
    Text { text: String },
}

/// Result of prompts/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Result of prompts/get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Renders a prompt from its (already validated) arguments.
pub type PromptRenderer = Arc<dyn Fn(&HashMap<String, String>) -> String + Send + Sync>;

struct Entry {
    prompt: Prompt,
    renderer: PromptRenderer,
    completions: HashMap<String, Vec<String>>,
}

/// Prompt registry.
#[derive(Default)]
pub struct PromptRegistry {
    prompts: HashMap<String, Entry>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prompt.
    pub fn register<F>(&mut self, prompt: Prompt, renderer: F)
    where
        F: Fn(&HashMap<String, String>) -> String + Send + Sync + 'static,
    {
        self.prompts.insert(
            prompt.name.clone(),
            Entry {
                prompt,
                renderer: Arc::new(renderer),
                completions: HashMap::new(),
            },
        );
    }

    /// Offer fixed completion values for one argument of a registered prompt.
    pub fn set_completions(&mut self, prompt: &str, argument: &str, values: &[&str]) {
        if let Some(entry) = self.prompts.get_mut(prompt) {
            entry.completions.insert(
                argument.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            );
        }
    }

    /// List all prompts, sorted by name.
    pub fn list(&self) -> Vec<Prompt> {
        let mut prompts: Vec<Prompt> = self.prompts.values().map(|e| e.prompt.clone()).collect();
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        prompts
    }

    /// Number of registered prompts.
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Render a prompt.
    pub fn get(&self, name: &str, arguments: &HashMap<String, String>) -> Result<GetPromptResult> {
        let entry = self
            .prompts
            .get(name)
            .ok_or_else(|| Error::PromptNotFound(name.to_string()))?;

        let missing: Vec<&str> = entry
            .prompt
            .arguments
            .iter()
            .filter(|a| a.required && !arguments.contains_key(&a.name))
            .map(|a| a.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(Error::InvalidParams(format!(
                "Missing required arguments for prompt {}: {}",
                name,
                missing.join(", ")
            )));
        }

        let text = (entry.renderer)(arguments);
        Ok(GetPromptResult {
            description: Some(entry.prompt.description.clone()),
            messages: vec![PromptMessage {
                role: Role::User,
                content: PromptContent::Text { text },
            }],
        })
    }

    /// Completion values for a prompt argument starting with `prefix`.
    pub fn complete(&self, prompt: &str, argument: &str, prefix: &str) -> Vec<String> {
        self.prompts
            .get(prompt)
            .and_then(|e| e.completions.get(argument))
            .map(|values| {
                values
                    .iter()
                    .filter(|v| v.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
