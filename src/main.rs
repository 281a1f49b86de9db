//! Human-in-the-Loop MCP Server
//!
//! Lets an AI assistant ask the human a question through a desktop dialog.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use human_in_the_loop::config::{Args, Config, LogFormat, Transport};
use human_in_the_loop::error::{Error, Result};
use human_in_the_loop::mcp::transport::StdioTransport;
use human_in_the_loop::{build_server, VERSION};

fn init_logging(config: &Config) -> Result<()> {
    // RUST_LOG wins over --debug.
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries the protocol in stdio mode.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| Error::Config(format!("Failed to set tracing subscriber: {}", e)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Build configuration from args
    let config: Config = args.into();
    init_logging(&config)?;

    info!("Human-in-the-Loop MCP Server v{}", VERSION);
    info!("Transport: {:?}", config.transport);
    info!("Dialog backend: {:?}", config.dialog_backend);

    let server = build_server(&config)?;

    match config.transport {
        Transport::Stdio => {
            info!("Starting stdio transport...");
            server.run(StdioTransport::new()).await?;
        }
        Transport::Http => {
            info!("Starting HTTP transport on {}...", config.bind_addr());
            human_in_the_loop::http::start_server(&config, server.clone()).await?;
        }
    }

    info!("Session metrics: {:?}", server.metrics().snapshot());
    Ok(())
}
