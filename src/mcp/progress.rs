//! MCP Progress Notifications
//!
//! Support for emitting progress updates during long-running tool calls.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::mcp::peer::Peer;

/// Method name of progress notifications.
pub const PROGRESS_METHOD: &str = "notifications/progress";

/// Progress token supplied by the client in `_meta.progressToken`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ProgressToken {
    String(String),
    Number(i64),
}

/// Progress notification params.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressParams {
    pub progress_token: ProgressToken,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressParams {
    pub fn new(
        token: ProgressToken,
        progress: f64,
        total: Option<f64>,
        message: Option<String>,
    ) -> Self {
        Self {
            progress_token: token,
            progress,
            total,
            message,
        }
    }
}

/// Progress reporter bound to one request's token.
#[derive(Clone)]
pub struct ProgressReporter {
    token: ProgressToken,
    peer: Arc<Peer>,
}

impl ProgressReporter {
    pub fn new(token: ProgressToken, peer: Arc<Peer>) -> Self {
        Self { token, peer }
    }

    /// The token progress is reported against.
    pub fn token(&self) -> &ProgressToken {
        &self.token
    }

    /// Send a progress notification. Send failures are ignored.
    pub async fn report(&self, progress: f64, total: Option<f64>, message: Option<&str>) {
        let params = ProgressParams::new(
            self.token.clone(),
            progress,
            total,
            message.map(String::from),
        );
        match serde_json::to_value(params) {
            Ok(value) => self.peer.notify(PROGRESS_METHOD, Some(value)).await,
            Err(e) => tracing::warn!("Failed to encode progress notification: {}", e),
        }
    }
}
