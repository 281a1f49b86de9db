//! Error types for the human-in-the-loop MCP server.

use thiserror::Error;

use crate::mcp::protocol::error_codes;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the server.
#[derive(Error, Debug)]
pub enum Error {
    // ===== MCP Errors =====
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidToolArguments(String),

    #[error("Unknown resource: {0}")]
    ResourceNotFound(String),

    #[error("Unknown prompt: {0}")]
    PromptNotFound(String),

    // ===== Client Errors =====
    #[error("Client does not support {0}")]
    CapabilityNotSupported(&'static str),

    #[error("Client error: {code} {message}")]
    ClientError { code: i32, message: String },

    #[error("No client connection available for server-initiated requests")]
    PeerUnavailable,

    #[error("Connection closed before the client responded")]
    ConnectionClosed,

    // ===== Dialog Errors =====
    #[error("No dialog backend available: {0}")]
    DialogUnavailable(String),

    #[error("Dialog failed: {0}")]
    Dialog(String),

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a client error from a JSON-RPC error object.
    pub fn client(code: i32, message: impl Into<String>) -> Self {
        Self::ClientError {
            code,
            message: message.into(),
        }
    }

    /// JSON-RPC error code used when this error is reported to the client.
    pub fn code(&self) -> i32 {
        match self {
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_)
            | Self::ToolNotFound(_)
            | Self::InvalidToolArguments(_)
            | Self::PromptNotFound(_) => error_codes::INVALID_PARAMS,
            Self::ResourceNotFound(_) => error_codes::RESOURCE_NOT_FOUND,
            Self::Json(_) => error_codes::PARSE_ERROR,
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Whether the error comes from the connected client rather than this server.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            Self::CapabilityNotSupported(_)
                | Self::ClientError { .. }
                | Self::PeerUnavailable
                | Self::ConnectionClosed
        )
    }
}
