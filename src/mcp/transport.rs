//! MCP transport layer implementations.
//!
//! `StdioTransport` speaks newline-delimited JSON on stdin/stdout.
//! `ChannelTransport` connects a server to an in-process client.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::mcp::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Capacity of the transport channels.
const CHANNEL_CAPACITY: usize = 100;

/// A message that can be sent or received.
#[derive(Debug, Clone)]
pub enum Message {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl Message {
    /// Serialize to a single JSON line (without the trailing newline).
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Message::Request(req) => serde_json::to_string(req),
            Message::Response(res) => serde_json::to_string(res),
            Message::Notification(notif) => serde_json::to_string(notif),
        }
    }
}

/// Classify and decode one JSON-RPC message.
///
/// `method` + `id` is a request, `method` alone a notification, and `id`
/// without `method` a response.
pub fn parse_message(text: &str) -> Result<Message> {
    let value: Value = serde_json::from_str(text)?;
    let obj = value
        .as_object()
        .ok_or_else(|| Error::McpProtocol("message is not a JSON object".to_string()))?;

    let has_method = obj.contains_key("method");
    let has_id = obj.get("id").map(|id| !id.is_null()).unwrap_or(false);

    match (has_method, has_id) {
        (true, true) => Ok(Message::Request(serde_json::from_value(value)?)),
        (true, false) => Ok(Message::Notification(serde_json::from_value(value)?)),
        (false, true) => Ok(Message::Response(serde_json::from_value(value)?)),
        (false, false) => Err(Error::McpProtocol(
            "message has neither method nor id".to_string(),
        )),
    }
}

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start the transport, returning channels for messages.
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)>;

    /// Stop the transport once every outgoing sender has been dropped,
    /// flushing whatever is still queued.
    async fn stop(&mut self) -> Result<()>;
}

/// Stdio transport for MCP.
pub struct StdioTransport {
    writer: Option<JoinHandle<()>>,
}

impl StdioTransport {
    /// Create a new stdio transport.
    pub fn new() -> Self {
        Self { writer: None }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)> {
        let (incoming_tx, incoming_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);

        // stdin reader
        tokio::spawn(async move {
            let mut reader = BufReader::new(tokio::io::stdin());
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!("EOF on stdin, stopping transport");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }

                        trace!("Received: {}", trimmed);

                        match parse_message(trimmed) {
                            Ok(msg) => {
                                if incoming_tx.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => error!("Failed to parse message ({}): {}", e, trimmed),
                        }
                    }
                    Err(e) => {
                        error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        // stdout writer, runs until every sender is gone
        self.writer = Some(tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();

            while let Some(msg) = outgoing_rx.recv().await {
                let json = match msg.to_json() {
                    Ok(s) => s,
                    Err(e) => {
                        error!("Error serializing message: {}", e);
                        continue;
                    }
                };

                trace!("Sending: {}", json);
                if let Err(e) = stdout.write_all(json.as_bytes()).await {
                    error!("Error writing to stdout: {}", e);
                    break;
                }
                if let Err(e) = stdout.write_all(b"\n").await {
                    error!("Error writing newline: {}", e);
                    break;
                }
                if let Err(e) = stdout.flush().await {
                    error!("Error flushing stdout: {}", e);
                    break;
                }
            }
            debug!("Outgoing channel closed, stdout writer done");
        }));

        Ok((incoming_rx, outgoing_tx))
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .await
                .map_err(|e| Error::Internal(format!("stdout writer failed: {}", e)))?;
        }
        Ok(())
    }
}

/// The client side of a [`ChannelTransport`].
pub struct ClientChannels {
    /// Messages from client to server.
    pub to_server: mpsc::Sender<Message>,
    /// Messages from server to client.
    pub from_server: mpsc::Receiver<Message>,
}

/// In-memory transport.
pub struct ChannelTransport {
    incoming: Option<mpsc::Receiver<Message>>,
    outgoing: Option<mpsc::Sender<Message>>,
}

impl ChannelTransport {
    /// Create a connected transport/client pair.
    pub fn pair() -> (Self, ClientChannels) {
        let (to_server, incoming) = mpsc::channel(CHANNEL_CAPACITY);
        let (outgoing, from_server) = mpsc::channel(CHANNEL_CAPACITY);
        (
            Self {
                incoming: Some(incoming),
                outgoing: Some(outgoing),
            },
            ClientChannels {
                to_server,
                from_server,
            },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)> {
        match (self.incoming.take(), self.outgoing.take()) {
            (Some(rx), Some(tx)) => Ok((rx, tx)),
            _ => Err(Error::McpProtocol(
                "channel transport already started".to_string(),
            )),
        }
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::RequestId;

    #[test]
    fn test_parse_request() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        match msg {
            Message::Request(req) => {
                assert_eq!(req.id, RequestId::Number(1));
                assert_eq!(req.method, "ping");
            }
            other => panic!("Expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_notification() {
        let msg =
            parse_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(matches!(msg, Message::Notification(n) if n.method == "notifications/initialized"));
    }

    #[test]
    fn test_parse_response() {
        let msg = parse_message(
            r#"{"jsonrpc":"2.0","id":"srv-3","result":{"action":"decline"}}"#,
        )
        .unwrap();
        match msg {
            Message::Response(res) => {
                assert_eq!(res.id, RequestId::String("srv-3".to_string()));
                assert!(res.result.is_some());
            }
            other => panic!("Expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_response() {
        let msg = parse_message(
            r#"{"jsonrpc":"2.0","id":4,"error":{"code":-32601,"message":"nope"}}"#,
        )
        .unwrap();
        assert!(matches!(msg, Message::Response(r) if r.error.is_some()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_message("not json").is_err());
        assert!(parse_message("[1,2,3]").is_err());
        assert!(parse_message(r#"{"jsonrpc":"2.0"}"#).is_err());
    }

    #[test]
    fn test_message_to_json() {
        let msg = Message::Notification(JsonRpcNotification::new("notifications/progress", None));
        let json = msg.to_json().unwrap();
        assert!(json.contains("notifications/progress"));
        assert!(!json.contains('\n'));
    }

    #[tokio::test]
    async fn test_channel_transport_starts_once() {
        let (mut transport, _client) = ChannelTransport::pair();
        assert!(transport.start().await.is_ok());
        assert!(transport.start().await.is_err());
    }
}
