//! MCP server implementation.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::mcp::context::ToolContext;
use crate::mcp::handler::{error_result, McpHandler};
use crate::mcp::peer::Peer;
use crate::mcp::prompts::{ListPromptsResult, PromptRegistry};
use crate::mcp::protocol::*;
use crate::mcp::resources::ResourceRegistry;
use crate::mcp::transport::{Message, Transport};
use crate::metrics::{Metrics, Timer};
use crate::VERSION;

/// MCP server.
#[derive(Clone)]
pub struct McpServer {
    handler: Arc<McpHandler>,
    prompts: Arc<PromptRegistry>,
    resources: Arc<ResourceRegistry>,
    metrics: Arc<Metrics>,
    name: String,
    version: String,
    /// Requests currently being handled, for cancellation support.
    in_flight: Arc<DashMap<RequestId, CancellationToken>>,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(
        handler: McpHandler,
        prompts: PromptRegistry,
        resources: ResourceRegistry,
        metrics: Arc<Metrics>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            prompts: Arc::new(prompts),
            resources: Arc::new(resources),
            metrics,
            name: name.into(),
            version: VERSION.to_string(),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Number of requests still being handled.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Run the server with the given transport until the client disconnects.
    pub async fn run<T: Transport>(&self, mut transport: T) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.name, self.version);

        let (mut incoming, outgoing) = transport.start().await?;
        let peer = Arc::new(Peer::new(outgoing.clone()));
        let tasks = TaskTracker::new();

        while let Some(msg) = incoming.recv().await {
            match msg {
                Message::Request(req) => self.spawn_request(req, &peer, &outgoing, &tasks),
                Message::Notification(notif) => self.handle_notification(notif),
                Message::Response(res) => peer.resolve(res),
            }
        }

        // Requests to the client can no longer be answered; everything else finishes.
        debug!("Client disconnected, draining {} request(s)", tasks.len());
        peer.close();
        tasks.close();
        tasks.wait().await;

        drop(peer);
        drop(outgoing);
        transport.stop().await?;
        info!("MCP server stopped");
        Ok(())
    }

    /// Handle a request on its own task so the loop keeps routing messages.
    fn spawn_request(
        &self,
        req: JsonRpcRequest,
        peer: &Arc<Peer>,
        outgoing: &mpsc::Sender<Message>,
        tasks: &TaskTracker,
    ) {
        let token = CancellationToken::new();
        self.in_flight.insert(req.id.clone(), token.clone());

        let server = self.clone();
        let peer = peer.clone();
        let outgoing = outgoing.clone();

        tasks.spawn(async move {
            let id = req.id.clone();
            let response = tokio::select! {
                _ = token.cancelled() => None,
                response = server.handle_request(req, &peer) => Some(response),
            };
            server.in_flight.remove(&id);

            match response {
                Some(response) => {
                    if outgoing.send(Message::Response(response)).await.is_err() {
                        warn!("Failed to send response for request {}", id);
                    }
                }
                None => info!("Request {} cancelled", id),
            }
        });
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, req: JsonRpcRequest, peer: &Arc<Peer>) -> JsonRpcResponse {
        debug!("Handling request: {} (id: {})", req.method, req.id);
        self.metrics.inc_requests();
        let timer = Timer::start();

        let result = match req.method.as_str() {
            // Core
            "initialize" => self.handle_initialize(req.params, peer).await,
            "ping" => Ok(json!({})),
            // Tools
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(req.params, peer).await,
            // Prompts
            "prompts/list" => self.handle_list_prompts(),
            "prompts/get" => self.handle_get_prompt(req.params),
            // Resources
            "resources/list" => serde_json::to_value(self.resources.list()).map_err(Error::from),
            "resources/templates/list" => {
                serde_json::to_value(self.resources.list_templates()).map_err(Error::from)
            }
            "resources/read" => self.handle_read_resource(req.params),
            // Logging
            "logging/setLevel" => self.handle_set_level(req.params, peer).await,
            // Completions
            "completion/complete" => self.handle_completion(req.params),
            // Unknown
            _ => Err(Error::MethodNotFound(req.method.clone())),
        };

        debug!("{} handled in {}ms", req.method, timer.elapsed_ms());

        match result {
            Ok(value) => JsonRpcResponse::success(req.id, value),
            Err(e) => {
                self.metrics.inc_failed();
                warn!("Request {} ({}) failed: {}", req.id, req.method, e);
                JsonRpcResponse::failure(req.id, e.code(), e.to_string())
            }
        }
    }

    /// Handle a notification.
    fn handle_notification(&self, notif: JsonRpcNotification) {
        debug!("Handling notification: {}", notif.method);

        match notif.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct CancelledParams {
                    request_id: RequestId,
                    #[serde(default)]
                    reason: Option<String>,
                }

                match notif.params.map(serde_json::from_value::<CancelledParams>) {
                    Some(Ok(cancel)) => match self.in_flight.remove(&cancel.request_id) {
                        Some((_, token)) => {
                            info!(
                                "Cancelling request {}: {}",
                                cancel.request_id,
                                cancel.reason.as_deref().unwrap_or("no reason given")
                            );
                            token.cancel();
                        }
                        None => debug!("Cancel for unknown request {}", cancel.request_id),
                    },
                    _ => warn!("Malformed cancellation notification"),
                }
            }
            "notifications/roots/list_changed" => {
                info!("Client roots changed");
            }
            _ => {
                debug!("Unknown notification: {}", notif.method);
            }
        }
    }

    /// Handle initialize request.
    async fn handle_initialize(&self, params: Option<Value>, peer: &Arc<Peer>) -> Result<Value> {
        let params: InitializeParams = match params {
            Some(value) => parse_params(Some(value))?,
            None => InitializeParams::default(),
        };

        if let Some(client) = &params.client_info {
            info!("Client: {} v{}", client.name, client.version);
        }
        let protocol_version = negotiate_version(params.protocol_version.as_deref());
        peer.set_capabilities(params.capabilities).await;

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
                prompts: Some(PromptsCapability {
                    list_changed: false,
                }),
                logging: Some(EmptyCapability {}),
                completions: Some(EmptyCapability {}),
            },
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
            },
            instructions: None,
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.handler.list_tools(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request. Tool failures are reported in the result.
    async fn handle_call_tool(&self, params: Option<Value>, peer: &Arc<Peer>) -> Result<Value> {
        let params: CallToolParams = parse_params(params)?;

        let handler = self
            .handler
            .get_tool(&params.name)
            .ok_or_else(|| Error::ToolNotFound(params.name.clone()))?;
        self.metrics.inc_tool_calls();

        let progress_token = params.meta.and_then(|m| m.progress_token);
        let ctx = ToolContext::new(peer.clone(), progress_token)
            .with_metrics(self.metrics.clone())
            .with_logger(self.name.clone());

        let result = match handler.execute(params.arguments, &ctx).await {
            Ok(result) => result,
            Err(e) => {
                self.metrics.inc_tool_failures();
                if e.is_client_side() {
                    info!("Tool {} stopped by the client: {}", params.name, e);
                } else {
                    warn!("Tool {} failed: {}", params.name, e);
                }
                error_result(format!("Error executing tool {}: {}", params.name, e))
            }
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_prompts(&self) -> Result<Value> {
        let result = ListPromptsResult {
            prompts: self.prompts.list(),
            next_cursor: None,
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_get_prompt(&self, params: Option<Value>) -> Result<Value> {
        #[derive(Deserialize)]
        struct GetPromptParams {
            name: String,
            #[serde(default)]
            arguments: HashMap<String, String>,
        }

        let params: GetPromptParams = parse_params(params)?;
        let result = self.prompts.get(&params.name, &params.arguments)?;
        Ok(serde_json::to_value(result)?)
    }

    fn handle_read_resource(&self, params: Option<Value>) -> Result<Value> {
        #[derive(Deserialize)]
        struct ReadParams {
            uri: String,
        }

        let params: ReadParams = parse_params(params)?;
        let result = self.resources.read(&params.uri)?;
        Ok(serde_json::to_value(result)?)
    }

    async fn handle_set_level(&self, params: Option<Value>, peer: &Arc<Peer>) -> Result<Value> {
        let params: SetLevelParams = parse_params(params)?;
        debug!("Client log level set to {:?}", params.level);
        peer.set_log_level(params.level).await;
        Ok(json!({}))
    }

    /// Handle completion request.
    fn handle_completion(&self, params: Option<Value>) -> Result<Value> {
        #[derive(Deserialize)]
        struct CompletionParams {
            r#ref: CompletionRef,
            argument: CompletionArgument,
        }

        #[derive(Deserialize)]
        struct CompletionRef {
            r#type: String,
            #[serde(default)]
            name: Option<String>,
        }

        #[derive(Deserialize)]
        struct CompletionArgument {
            name: String,
            #[serde(default)]
            value: String,
        }

        let params: CompletionParams = parse_params(params)?;

        let values = match (params.r#ref.r#type.as_str(), &params.r#ref.name) {
            ("ref/prompt", Some(prompt)) => {
                self.prompts
                    .complete(prompt, &params.argument.name, &params.argument.value)
            }
            _ => Vec::new(),
        };

        Ok(json!({
            "completion": {
                "values": values,
                "total": values.len(),
                "hasMore": false
            }
        }))
    }
}

fn parse_params<P: DeserializeOwned>(params: Option<Value>) -> Result<P> {
    let value = params.ok_or_else(|| Error::InvalidParams("Missing params".to_string()))?;
    serde_json::from_value(value).map_err(|e| Error::InvalidParams(e.to_string()))
}
