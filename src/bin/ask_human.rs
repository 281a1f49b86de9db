//! Show the human-in-the-loop input dialog from the command line.
//!
//! Prints the answer on stdout. Exits 1 when the dialog is cancelled and 2
//! when no dialog could be shown.

use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use human_in_the_loop::dialog::{
    DialogBackend, DialogRequest, InputDialog, NativeDialog, DEFAULT_PADDING, DEFAULT_TITLE,
    DEFAULT_WIDTH,
};

/// Command-line arguments for the dialog helper.
#[derive(Parser, Debug)]
#[command(name = "ask-human")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ask the human a question in a desktop dialog and print the answer")]
struct Args {
    /// Question shown above the text field
    message: String,

    /// Window title
    #[arg(long, default_value = DEFAULT_TITLE, env = "HITL_DIALOG_TITLE")]
    title: String,

    /// Window width in pixels
    #[arg(long, default_value_t = DEFAULT_WIDTH, env = "HITL_DIALOG_WIDTH")]
    width: u32,

    /// Padding inside the window in pixels
    #[arg(long, default_value_t = DEFAULT_PADDING, env = "HITL_DIALOG_PADDING")]
    padding: u32,

    /// Program used to draw the dialog
    #[arg(long, default_value = "auto", env = "HITL_DIALOG_BACKEND")]
    backend: DialogBackend,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let request = DialogRequest::new(args.message)
        .with_title(args.title)
        .with_width(args.width)
        .with_padding(args.padding);

    match NativeDialog::new(args.backend).prompt(&request).await {
        Ok(Some(answer)) => {
            println!("{}", answer);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::from(1),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(2)
        }
    }
}
