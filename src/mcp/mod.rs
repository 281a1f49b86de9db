//! Model Context Protocol (MCP) implementation.
//!
//! JSON-RPC message handling, transports, and the registries for tools,
//! prompts and resources, plus the client handle used for elicitation,
//! sampling, logging and progress.
//!
//! # Architecture
//!
//! - `protocol` - Core MCP types and message definitions
//! - `server` - MCP server implementation
//! - `transport` - Transport layer (stdio, in-process channels)
//! - `peer` - Server-to-client requests and notifications
//! - `context` - Per-call context handed to tools
//! - `handler` - Tool trait and registry

pub mod context;
pub mod handler;
pub mod peer;
pub mod progress;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod transport;

pub use context::{Elicitation, ToolContext};
pub use handler::{McpHandler, ToolHandler};
pub use peer::Peer;
pub use protocol::*;
pub use server::McpServer;
pub use transport::{ChannelTransport, StdioTransport, Transport};
