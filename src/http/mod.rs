//! HTTP server for MCP over HTTP transport.
//!
//! One JSON-RPC message per `POST /mcp`. There is no channel back to the
//! client, so elicitation and sampling are unavailable in this mode.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::mcp::peer::Peer;
use crate::mcp::protocol::error_codes;
use crate::mcp::server::McpServer;
use crate::mcp::transport::{parse_message, Message};

/// HTTP server state.
#[derive(Clone)]
pub struct HttpState {
    server: McpServer,
    peer: Arc<Peer>,
}

impl HttpState {
    pub fn new(server: McpServer) -> Self {
        Self {
            server,
            peer: Arc::new(Peer::detached()),
        }
    }
}

/// Routes served by the HTTP transport.
pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/mcp", post(mcp_message))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and serve until Ctrl-C.
pub async fn start_server(config: &Config, server: McpServer) -> Result<()> {
    let app = router(HttpState::new(server));

    let addr = config.bind_addr();
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Health check endpoint.
async fn health_check(State(state): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "name": state.server.name(),
        "version": crate::VERSION
    }))
}

/// Prometheus metrics endpoint.
async fn metrics(State(state): State<HttpState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.server.metrics().to_prometheus(),
    )
}

/// JSON-RPC endpoint.
async fn mcp_message(State(state): State<HttpState>, body: String) -> Response {
    let message = match parse_message(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!("Rejected HTTP message: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": { "code": error_codes::PARSE_ERROR, "message": e.to_string() }
                })),
            )
                .into_response();
        }
    };

    match message {
        Message::Request(req) => {
            let response = state.server.handle_request(req, &state.peer).await;
            Json(response).into_response()
        }
        Message::Notification(notif) => {
            debug!("Ignoring HTTP notification: {}", notif.method);
            StatusCode::ACCEPTED.into_response()
        }
        Message::Response(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {
                    "code": error_codes::INVALID_REQUEST,
                    "message": "No server request is awaiting a response"
                }
            })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::McpHandler;
    use crate::mcp::prompts::PromptRegistry;
    use crate::mcp::resources::ResourceRegistry;
    use crate::metrics::Metrics;
    use crate::tools;
    use serde_json::Value;

    fn state() -> HttpState {
        let metrics = Metrics::new();
        let mut handler = McpHandler::new();
        tools::register_all_tools(
            &mut handler,
            Arc::new(crate::dialog::NativeDialog::default()),
            tools::DialogLayout::default(),
            metrics.clone(),
        );
        let mut resources = ResourceRegistry::new();
        tools::register_all_resources(&mut resources).unwrap();
        let mut prompts = PromptRegistry::new();
        tools::register_all_prompts(&mut prompts);
        HttpState::new(McpServer::new(
            handler,
            prompts,
            resources,
            metrics,
            "http-test",
        ))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let state = state();
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"resources/read","params":{"uri":"greeting://Ana"}}"#;

        let response = mcp_message(State(state), body.to_string()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["id"], 1);
        assert_eq!(json["result"]["contents"][0]["text"], "Hello, Ana!");
    }

    #[tokio::test]
    async fn test_elicitation_unavailable_over_http() {
        let state = state();
        let init = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"capabilities":{"elicitation":{}}}}"#;
        mcp_message(State(state.clone()), init.to_string()).await;

        let call = r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"book_table","arguments":{"date":"2024-12-25","time":"19:00","party_size":2}}}"#;
        let json = body_json(mcp_message(State(state), call.to_string()).await).await;
        assert_eq!(json["result"]["isError"], true);
        assert!(json["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("No client connection available"));
    }

    #[tokio::test]
    async fn test_notification_accepted() {
        let body = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        let response = mcp_message(State(state()), body.to_string()).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let response = mcp_message(State(state()), "not json".to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], error_codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let state = state();
        let ping = r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#;
        mcp_message(State(state.clone()), ping.to_string()).await;

        let response = metrics(State(state)).await.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("human_in_the_loop_requests_total 1"));
    }
}
