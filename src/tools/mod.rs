//! MCP tool, resource and prompt implementations.
//!
//! - `ask_human` - Native input dialog (1 tool)
//! - `task` - Progress reporting demo (1 tool)
//! - `booking` - Elicitation demo (1 tool)
//! - `poem` - Sampling demo (1 tool)
//! - `greeting` - Greeting resource template and prompt

pub mod ask_human;
pub mod booking;
pub mod greeting;
pub mod poem;
pub mod task;

use std::sync::Arc;

use crate::dialog::InputDialog;
use crate::error::Result;
use crate::mcp::handler::McpHandler;
use crate::mcp::prompts::PromptRegistry;
use crate::mcp::resources::ResourceRegistry;
use crate::metrics::Metrics;

pub use ask_human::DialogLayout;

/// Register all tools with the handler.
pub fn register_all_tools(
    handler: &mut McpHandler,
    dialog: Arc<dyn InputDialog>,
    layout: DialogLayout,
    metrics: Arc<Metrics>,
) {
    handler.register(ask_human::AskHumanTool::new(dialog, layout, metrics));
    handler.register(task::LongRunningTaskTool::new());
    handler.register(booking::BookTableTool::new());
    handler.register(poem::GeneratePoemTool::new());
}

/// Register all resource templates.
pub fn register_all_resources(registry: &mut ResourceRegistry) -> Result<()> {
    greeting::register_resources(registry)
}

/// Register all prompts.
pub fn register_all_prompts(registry: &mut PromptRegistry) {
    greeting::register_prompts(registry);
}
