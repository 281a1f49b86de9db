//! Human-in-the-Loop MCP Server
//!
//! A Model Context Protocol (MCP) server that lets an AI assistant put a
//! question in front of the human at the keyboard and wait for the answer.
//!
//! # Architecture
//!
//! 1. **MCP Layer** (`mcp`) - Protocol implementation, transports, client peer
//! 2. **Dialog Layer** (`dialog`) - Native modal input dialog per platform
//! 3. **Tools Layer** (`tools`) - `ask_human` plus the elicitation, sampling
//!    and progress demo tools, the greeting resource and prompt
//! 4. **HTTP** (`http`) - Optional request/response transport with metrics
//!
//! # Features
//!
//! - **Ask Human**: Blocking text-entry dialog via zenity, kdialog, osascript or PowerShell
//! - **Elicitation**: Tools ask the client for structured input mid-call
//! - **Sampling**: Tools ask the client's model to generate text
//! - **Progress and Logging**: Notifications streamed while a tool runs

pub mod config;
pub mod dialog;
pub mod error;
pub mod http;
pub mod mcp;
pub mod metrics;
pub mod tools;

use std::sync::Arc;
use tracing::info;

pub use error::{Error, Result};

use config::Config;
use dialog::NativeDialog;
use mcp::handler::McpHandler;
use mcp::prompts::PromptRegistry;
use mcp::resources::ResourceRegistry;
use mcp::server::McpServer;
use metrics::Metrics;

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Assemble a server with every tool, resource and prompt registered.
pub fn build_server(config: &Config) -> Result<McpServer> {
    let metrics = Metrics::new();

    let mut handler = McpHandler::new();
    tools::register_all_tools(
        &mut handler,
        Arc::new(NativeDialog::new(config.dialog_backend)),
        config.dialog_layout(),
        metrics.clone(),
    );
    info!("Registered {} MCP tools", handler.tool_count());

    let mut resources = ResourceRegistry::new();
    tools::register_all_resources(&mut resources)?;

    let mut prompts = PromptRegistry::new();
    tools::register_all_prompts(&mut prompts);

    Ok(McpServer::new(
        handler,
        prompts,
        resources,
        metrics,
        config.name.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_server() {
        let server = build_server(&Config::default()).unwrap();
        assert_eq!(server.name(), config::DEFAULT_SERVER_NAME);
        assert_eq!(server.in_flight_count(), 0);
    }
}
