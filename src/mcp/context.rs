//! Per-call context handed to tool handlers.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::mcp::peer::Peer;
use crate::mcp::progress::{ProgressReporter, ProgressToken};
use crate::mcp::protocol::{
    CreateMessageParams, CreateMessageResult, ElicitAction, ElicitRequestParams, ElicitResult,
    LoggingLevel, LoggingMessageParams,
};
use crate::metrics::Metrics;

/// Outcome of an elicitation, with the content decoded into `T`.
#[derive(Debug, Clone)]
pub struct Elicitation<T> {
    pub action: ElicitAction,
    /// Present only when the human accepted and the content matched `T`.
    pub data: Option<T>,
}

impl<T: DeserializeOwned> Elicitation<T> {
    /// Decode a raw elicitation result.
    pub fn from_result(result: ElicitResult) -> Self {
        let data = match (result.action, result.content) {
            (ElicitAction::Accept, Some(content)) => {
                match serde_json::from_value(Value::Object(content)) {
                    Ok(data) => Some(data),
                    Err(e) => {
                        debug!("Elicitation content did not match schema: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };
        Self {
            action: result.action,
            data,
        }
    }

    pub fn accepted(&self) -> bool {
        self.action == ElicitAction::Accept
    }
}

/// Context for one tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    peer: Arc<Peer>,
    progress: Option<ProgressReporter>,
    metrics: Option<Arc<Metrics>>,
    logger: Option<String>,
}

impl ToolContext {
    pub fn new(peer: Arc<Peer>, progress_token: Option<ProgressToken>) -> Self {
        let progress = progress_token.map(|token| ProgressReporter::new(token, peer.clone()));
        Self {
            peer,
            progress,
            metrics: None,
            logger: None,
        }
    }

    /// Context with no client behind it.
    pub fn detached() -> Self {
        Self::new(Arc::new(Peer::detached()), None)
    }

    /// Attach the metrics collector elicitation and sampling are counted in.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Name log notifications are attributed to.
    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    /// Send a log notification if `level` passes the client's threshold.
    pub async fn log(&self, level: LoggingLevel, message: impl Into<String>) {
        if level < self.peer.log_level().await {
            return;
        }
        let params = LoggingMessageParams {
            level,
            logger: self.logger.clone(),
            data: Value::String(message.into()),
        };
        if let Ok(value) = serde_json::to_value(params) {
            self.peer.notify("notifications/message", Some(value)).await;
        }
    }

    pub async fn debug(&self, message: impl Into<String>) {
        self.log(LoggingLevel::Debug, message).await;
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.log(LoggingLevel::Info, message).await;
    }

    pub async fn warning(&self, message: impl Into<String>) {
        self.log(LoggingLevel::Warning, message).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.log(LoggingLevel::Error, message).await;
    }

    /// Report progress. A no-op unless the client asked for progress.
    pub async fn report_progress(&self, progress: f64, total: Option<f64>, message: Option<&str>) {
        if let Some(reporter) = &self.progress {
            reporter.report(progress, total, message).await;
        }
    }

    /// Ask the human for structured input matching `schema`.
    pub async fn elicit<T: DeserializeOwned>(
        &self,
        message: impl Into<String>,
        schema: Value,
    ) -> Result<Elicitation<T>> {
        if self.peer.is_detached() {
            return Err(Error::PeerUnavailable);
        }
        if !self.peer.supports_elicitation().await {
            return Err(Error::CapabilityNotSupported("elicitation"));
        }
        if let Some(metrics) = &self.metrics {
            metrics.inc_elicitations();
        }

        let params = ElicitRequestParams {
            message: message.into(),
            requested_schema: schema,
        };
        let raw = self
            .peer
            .request("elicitation/create", Some(serde_json::to_value(params)?))
            .await?;
        let result: ElicitResult = serde_json::from_value(raw)
            .map_err(|e| Error::McpProtocol(format!("Invalid elicitation result: {}", e)))?;

        Ok(Elicitation::from_result(result))
    }

    /// Ask the client's model to generate a message.
    pub async fn create_message(&self, params: CreateMessageParams) -> Result<CreateMessageResult> {
        if self.peer.is_detached() {
            return Err(Error::PeerUnavailable);
        }
        if !self.peer.supports_sampling().await {
            return Err(Error::CapabilityNotSupported("sampling"));
        }
        if let Some(metrics) = &self.metrics {
            metrics.inc_samplings();
        }

        let raw = self
            .peer
            .request("sampling/createMessage", Some(serde_json::to_value(params)?))
            .await?;
        serde_json::from_value(raw)
            .map_err(|e| Error::McpProtocol(format!("Invalid sampling result: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{ClientCapabilities, JsonRpcResponse};
    use crate::mcp::transport::Message;
    use serde::Deserialize;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[derive(Debug, Deserialize)]
    struct Answer {
        value: String,
    }

    fn accepted(content: Value) -> ElicitResult {
        ElicitResult {
            action: ElicitAction::Accept,
            content: content.as_object().cloned(),
        }
    }

    #[test]
    fn test_elicitation_decodes_accepted_content() {
        let e: Elicitation<Answer> = Elicitation::from_result(accepted(json!({"value": "yes"})));
        assert!(e.accepted());
        assert_eq!(e.data.unwrap().value, "yes");
    }

    #[test]
    fn test_elicitation_malformed_content() {
        let e: Elicitation<Answer> = Elicitation::from_result(accepted(json!({"other": 1})));
        assert!(e.accepted());
        assert!(e.data.is_none());
    }

    #[test]
    fn test_elicitation_declined_ignores_content() {
        let e: Elicitation<Answer> = Elicitation::from_result(ElicitResult {
            action: ElicitAction::Decline,
            content: json!({"value": "yes"}).as_object().cloned(),
        });
        assert!(!e.accepted());
        assert!(e.data.is_none());
    }

    #[tokio::test]
    async fn test_log_respects_threshold() {
        let (tx, mut rx) = mpsc::channel(10);
        let peer = Arc::new(Peer::new(tx));
        peer.set_log_level(LoggingLevel::Warning).await;
        let ctx = ToolContext::new(peer, None);

        ctx.info("dropped").await;
        ctx.warning("kept").await;
        drop(ctx);

        let Some(Message::Notification(n)) = rx.recv().await else {
            panic!("Expected notification");
        };
        assert_eq!(n.method, "notifications/message");
        let params: LoggingMessageParams = serde_json::from_value(n.params.unwrap()).unwrap();
        assert_eq!(params.level, LoggingLevel::Warning);
        assert_eq!(params.data, json!("kept"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_progress_requires_token() {
        let (tx, mut rx) = mpsc::channel(10);
        let ctx = ToolContext::new(Arc::new(Peer::new(tx)), None);
        ctx.report_progress(0.5, Some(1.0), None).await;
        drop(ctx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_elicit_requires_capability() {
        let (tx, mut rx) = mpsc::channel(10);
        let ctx = ToolContext::new(Arc::new(Peer::new(tx)), None);
        let result = ctx.elicit::<Answer>("question?", json!({})).await;
        assert!(matches!(
            result,
            Err(Error::CapabilityNotSupported("elicitation"))
        ));
        drop(ctx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_detached_context_has_no_peer() {
        let ctx = ToolContext::detached();
        let elicited = ctx.elicit::<Answer>("question?", json!({})).await;
        assert!(matches!(elicited, Err(Error::PeerUnavailable)));

        let sampled = ctx
            .create_message(CreateMessageParams {
                messages: vec![crate::mcp::protocol::SamplingMessage::user_text("hi")],
                max_tokens: 10,
                system_prompt: None,
                temperature: None,
            })
            .await;
        assert!(matches!(sampled, Err(Error::PeerUnavailable)));
    }

    #[tokio::test]
    async fn test_create_message_round_trip() {
        let (tx, mut rx) = mpsc::channel(10);
        let peer = Arc::new(Peer::new(tx));
        peer.set_capabilities(ClientCapabilities {
            sampling: Some(json!({})),
            ..Default::default()
        })
        .await;
        let metrics = Arc::new(Metrics::default());
        let ctx = ToolContext::new(peer.clone(), None).with_metrics(metrics.clone());

        let call = tokio::spawn(async move {
            ctx.create_message(CreateMessageParams {
                messages: vec![crate::mcp::protocol::SamplingMessage::user_text("hi")],
                max_tokens: 10,
                system_prompt: None,
                temperature: None,
            })
            .await
        });

        let Some(Message::Request(req)) = rx.recv().await else {
            panic!("Expected sampling request");
        };
        assert_eq!(req.method, "sampling/createMessage");
        peer.resolve(JsonRpcResponse::success(
            req.id,
            json!({
                "role": "assistant",
                "content": { "type": "text", "text": "hello" },
                "model": "test-model"
            }),
        ));

        let result = call.await.unwrap().unwrap();
        assert_eq!(result.model, "test-model");
        assert_eq!(metrics.snapshot().samplings, 1);
    }
}
