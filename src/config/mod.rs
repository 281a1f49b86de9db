//! Configuration management for the human-in-the-loop server.

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::dialog::{DialogBackend, DEFAULT_PADDING, DEFAULT_TITLE, DEFAULT_WIDTH};
use crate::tools::DialogLayout;

/// Name the server reports in `initialize`.
pub const DEFAULT_SERVER_NAME: &str = "hw-mcp-human-in-the-loop";

/// Command-line arguments for the human-in-the-loop server.
#[derive(Parser, Debug, Clone)]
#[command(name = "human-in-the-loop")]
#[command(author = "Human-in-the-Loop Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server that lets an AI assistant ask a human through a desktop dialog")]
pub struct Args {
    /// Transport mode: stdio or http
    #[arg(short, long, default_value = "stdio", env = "HITL_TRANSPORT")]
    pub transport: Transport,

    /// HTTP bind address (only for http transport)
    #[arg(long, default_value = "127.0.0.1", env = "HITL_HOST")]
    pub host: String,

    /// HTTP port (only for http transport)
    #[arg(short, long, default_value = "3000", env = "HITL_PORT")]
    pub port: u16,

    /// Enable debug logging
    #[arg(short, long, env = "HITL_DEBUG")]
    pub debug: bool,

    /// Log output format: text or json
    #[arg(long, default_value = "text", env = "HITL_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Server name reported to clients
    #[arg(long, default_value = DEFAULT_SERVER_NAME, env = "HITL_SERVER_NAME")]
    pub name: String,

    /// Title of the question dialog
    #[arg(long, default_value = DEFAULT_TITLE, env = "HITL_DIALOG_TITLE")]
    pub dialog_title: String,

    /// Width of the question dialog in pixels
    #[arg(long, default_value_t = DEFAULT_WIDTH, env = "HITL_DIALOG_WIDTH")]
    pub dialog_width: u32,

    /// Padding inside the question dialog in pixels
    #[arg(long, default_value_t = DEFAULT_PADDING, env = "HITL_DIALOG_PADDING")]
    pub dialog_padding: u32,

    /// Program used to draw the dialog
    #[arg(long, default_value = "auto", env = "HITL_DIALOG_BACKEND")]
    pub dialog_backend: DialogBackend,
}

/// Transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport mode
    pub transport: Transport,
    /// HTTP bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Debug mode
    pub debug: bool,
    /// Log format
    pub log_format: LogFormat,
    /// Server name
    pub name: String,
    /// Dialog title
    pub dialog_title: String,
    /// Dialog width
    pub dialog_width: u32,
    /// Dialog padding
    pub dialog_padding: u32,
    /// Dialog backend
    pub dialog_backend: DialogBackend,
}

impl Config {
    /// Layout applied to every `ask_human` dialog.
    pub fn dialog_layout(&self) -> DialogLayout {
        DialogLayout {
            title: self.dialog_title.clone(),
            width: self.dialog_width,
            padding: self.dialog_padding,
        }
    }

    /// `host:port` the HTTP transport binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            transport: args.transport,
            host: args.host,
            port: args.port,
            debug: args.debug,
            log_format: args.log_format,
            name: args.name,
            dialog_title: args.dialog_title,
            dialog_width: args.dialog_width,
            dialog_padding: args.dialog_padding,
            dialog_backend: args.dialog_backend,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            host: "127.0.0.1".to_string(),
            port: 3000,
            debug: false,
            log_format: LogFormat::Text,
            name: DEFAULT_SERVER_NAME.to_string(),
            dialog_title: DEFAULT_TITLE.to_string(),
            dialog_width: DEFAULT_WIDTH,
            dialog_padding: DEFAULT_PADDING,
            dialog_backend: DialogBackend::Auto,
        }
    }
}
