//! MCP Resources Support
//!
//! Resources are served from URI templates such as `greeting://{name}`.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A concrete resource exposed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A parameterized resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Resource contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Result of resources/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Result of resources/templates/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourceTemplatesResult {
    pub resource_templates: Vec<ResourceTemplate>,
}

/// Result of resources/read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Var(String),
}

/// A level-1 URI template (`{var}` expansions only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    parts: Vec<Part>,
}

impl UriTemplate {
    /// Parse a template; braces must be balanced and variables non-empty.
    pub fn parse(template: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                parts.push(Part::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                Error::Config(format!("Unclosed variable in URI template: {}", template))
            })?;
            let name = &after[..close];
            if name.is_empty() || name.contains('{') {
                return Err(Error::Config(format!(
                    "Invalid variable in URI template: {}",
                    template
                )));
            }
            if matches!(parts.last(), Some(Part::Var(_))) {
                return Err(Error::Config(format!(
                    "Adjacent variables in URI template: {}",
                    template
                )));
            }
            parts.push(Part::Var(name.to_string()));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self { parts })
    }

    /// Match a URI, returning the percent-decoded variable bindings.
    ///
    /// A variable matches a non-empty run of characters up to the next
    /// literal and never crosses a `/`.
    pub fn matches(&self, uri: &str) -> Option<HashMap<String, String>> {
        let mut bindings = HashMap::new();
        let mut rest = uri;

        for (i, part) in self.parts.iter().enumerate() {
            match part {
                Part::Literal(lit) => {
                    rest = rest.strip_prefix(lit.as_str())?;
                }
                Part::Var(name) => {
                    let end = match self.parts.get(i + 1) {
                        Some(Part::Literal(next)) => rest.find(next.as_str())?,
                        _ => rest.len(),
                    };
                    let raw = &rest[..end];
                    if raw.is_empty() || raw.contains('/') {
                        return None;
                    }
                    let value = percent_decode_str(raw).decode_utf8_lossy().into_owned();
                    bindings.insert(name.clone(), value);
                    rest = &rest[end..];
                }
            }
        }

        rest.is_empty().then_some(bindings)
    }
}

/// Produces the text of a templated resource from its bindings.
pub type ResourceReader = Arc<dyn Fn(&HashMap<String, String>) -> Result<String> + Send + Sync>;

struct TemplateEntry {
    template: ResourceTemplate,
    matcher: UriTemplate,
    reader: ResourceReader,
}

/// Resource registry.
#[derive(Default)]
pub struct ResourceRegistry {
    templates: Vec<TemplateEntry>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a templated resource.
    pub fn register_template<F>(&mut self, template: ResourceTemplate, reader: F) -> Result<()>
    where
        F: Fn(&HashMap<String, String>) -> Result<String> + Send + Sync + 'static,
    {
        let matcher = UriTemplate::parse(&template.uri_template)?;
        self.templates.push(TemplateEntry {
            template,
            matcher,
            reader: Arc::new(reader),
        });
        Ok(())
    }

    /// Concrete resources. Everything here is templated, so this is empty.
    pub fn list(&self) -> ListResourcesResult {
        ListResourcesResult {
            resources: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn list_templates(&self) -> ListResourceTemplatesResult {
        ListResourceTemplatesResult {
            resource_templates: self.templates.iter().map(|e| e.template.clone()).collect(),
        }
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Read the resource at `uri` from the first matching template.
    pub fn read(&self, uri: &str) -> Result<ReadResourceResult> {
        for entry in &self.templates {
            if let Some(bindings) = entry.matcher.matches(uri) {
                let text = (entry.reader)(&bindings)?;
                return Ok(ReadResourceResult {
                    contents: vec![ResourceContents {
                        uri: uri.to_string(),
                        mime_type: entry.template.mime_type.clone(),
                        text: Some(text),
                    }],
                });
            }
        }
        Err(Error::ResourceNotFound(uri.to_string()))
    }
}
