//! The server's handle on the connected client.
//!
//! Server-initiated requests (elicitation, sampling) are correlated with the
//! client's responses through a map of pending one-shot slots keyed by id.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mcp::protocol::{
    ClientCapabilities, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, LoggingLevel,
    RequestId,
};
use crate::mcp::transport::Message;

/// Connection to the client.
pub struct Peer {
    outgoing: Option<mpsc::Sender<Message>>,
    pending: DashMap<RequestId, oneshot::Sender<JsonRpcResponse>>,
    next_id: AtomicI64,
    closed: AtomicBool,
    capabilities: RwLock<Option<ClientCapabilities>>,
    min_log_level: RwLock<LoggingLevel>,
}

impl Peer {
    /// Peer writing to the given outgoing channel.
    pub fn new(outgoing: mpsc::Sender<Message>) -> Self {
        Self::with_outgoing(Some(outgoing))
    }

    /// Peer with no way to reach the client.
    pub fn detached() -> Self {
        Self::with_outgoing(None)
    }

    fn with_outgoing(outgoing: Option<mpsc::Sender<Message>>) -> Self {
        Self {
            outgoing,
            pending: DashMap::new(),
            next_id: AtomicI64::new(1),
            closed: AtomicBool::new(false),
            capabilities: RwLock::new(None),
            min_log_level: RwLock::new(LoggingLevel::default()),
        }
    }

    /// Whether messages can be sent to the client.
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
            && self.outgoing.as_ref().map(|tx| !tx.is_closed()).unwrap_or(false)
    }

    /// Whether this peer was created without a client behind it.
    pub fn is_detached(&self) -> bool {
        self.outgoing.is_none()
    }

    /// Record the capabilities from `initialize`.
    pub async fn set_capabilities(&self, capabilities: ClientCapabilities) {
        *self.capabilities.write().await = Some(capabilities);
    }

    /// Whether the client declared elicitation support.
    pub async fn supports_elicitation(&self) -> bool {
        self.capabilities
            .read()
            .await
            .as_ref()
            .map(|c| c.elicitation.is_some())
            .unwrap_or(false)
    }

    /// Whether the client declared sampling support.
    pub async fn supports_sampling(&self) -> bool {
        self.capabilities
            .read()
            .await
            .as_ref()
            .map(|c| c.sampling.is_some())
            .unwrap_or(false)
    }

    /// Set the minimum level of log notifications forwarded to the client.
    pub async fn set_log_level(&self, level: LoggingLevel) {
        *self.min_log_level.write().await = level;
    }

    /// Minimum level of log notifications forwarded to the client.
    pub async fn log_level(&self) -> LoggingLevel {
        *self.min_log_level.read().await
    }

    /// Number of server-initiated requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Send a request to the client and wait for its response.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let outgoing = self.outgoing.as_ref().ok_or(Error::PeerUnavailable)?;

        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);
        let _pending = PendingGuard {
            peer: self,
            id: id.clone(),
        };
        // Checked after registering so a concurrent close() cannot miss the slot.
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }

        debug!("Sending {} to client (id: {})", method, id);
        let request = JsonRpcRequest::new(id.clone(), method, params);
        if outgoing.send(Message::Request(request)).await.is_err() {
            return Err(Error::ConnectionClosed);
        }

        let response = rx.await.map_err(|_| Error::ConnectionClosed)?;
        match (response.result, response.error) {
            (_, Some(err)) => Err(Error::client(err.code, err.message)),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }

    /// Send a notification to the client. Failures are ignored.
    pub async fn notify(&self, method: &str, params: Option<Value>) {
        if let Some(outgoing) = &self.outgoing {
            let notification = JsonRpcNotification::new(method, params);
            if outgoing.send(Message::Notification(notification)).await.is_err() {
                debug!("Dropped {} notification: connection closed", method);
            }
        }
    }

    /// Hand a client response to the request waiting for it.
    pub fn resolve(&self, response: JsonRpcResponse) {
        match self.pending.remove(&response.id) {
            Some((_, slot)) => {
                let _ = slot.send(response);
            }
            None => warn!("Received response for unknown request: {}", response.id),
        }
    }

    /// Fail every pending request, and any later one, with `ConnectionClosed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pending.clear();
    }
}

/// Drops the pending slot when the waiting request goes away, answered or not.
struct PendingGuard<'a> {
    peer: &'a Peer,
    id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.peer.pending.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_request_resolved_by_response() {
        let (tx, mut rx) = mpsc::channel(10);
        let peer = Arc::new(Peer::new(tx));

        let waiter = {
            let peer = peer.clone();
            tokio::spawn(async move { peer.request("ping", None).await })
        };

        let sent = match rx.recv().await.unwrap() {
            Message::Request(req) => req,
            other => panic!("Expected request, got {:?}", other),
        };
        assert_eq!(sent.method, "ping");
        assert_eq!(peer.pending_count(), 1);

        peer.resolve(JsonRpcResponse::success(sent.id, json!({"pong": true})));

        let result = waiter.await.unwrap().unwrap();
        assert_eq!(result["pong"], true);
        assert_eq!(peer.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_request_error_response() {
        let (tx, mut rx) = mpsc::channel(10);
        let peer = Arc::new(Peer::new(tx));

        let waiter = {
            let peer = peer.clone();
            tokio::spawn(async move { peer.request("sampling/createMessage", None).await })
        };

        let Some(Message::Request(sent)) = rx.recv().await else {
            panic!("Expected request");
        };
        peer.resolve(JsonRpcResponse::failure(sent.id, -1, "User rejected sampling"));

        match waiter.await.unwrap() {
            Err(Error::ClientError { code, message }) => {
                assert_eq!(code, -1);
                assert_eq!(message, "User rejected sampling");
            }
            other => panic!("Expected client error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_fails_pending() {
        let (tx, mut rx) = mpsc::channel(10);
        let peer = Arc::new(Peer::new(tx));

        let waiter = {
            let peer = peer.clone();
            tokio::spawn(async move { peer.request("elicitation/create", None).await })
        };
        let _ = rx.recv().await;
        peer.close();

        assert!(matches!(waiter.await.unwrap(), Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_request_after_close() {
        let (tx, mut rx) = mpsc::channel(10);
        let peer = Peer::new(tx);
        assert!(peer.is_connected());

        peer.close();
        assert!(!peer.is_connected());
        assert!(matches!(
            peer.request("elicitation/create", None).await,
            Err(Error::ConnectionClosed)
        ));
        assert_eq!(peer.pending_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_detached_peer() {
        let peer = Peer::detached();
        assert!(peer.is_detached());
        assert!(!peer.is_connected());
        assert!(matches!(
            peer.request("ping", None).await,
            Err(Error::PeerUnavailable)
        ));
        peer.notify("notifications/message", None).await;
    }

    #[tokio::test]
    async fn test_capabilities() {
        let (tx, _rx) = mpsc::channel(1);
        let peer = Peer::new(tx);
        assert!(!peer.supports_elicitation().await);

        peer.set_capabilities(ClientCapabilities {
            elicitation: Some(json!({})),
            ..Default::default()
        })
        .await;
        assert!(peer.supports_elicitation().await);
        assert!(!peer.supports_sampling().await);
    }

    #[tokio::test]
    async fn test_log_level() {
        let peer = Peer::detached();
        assert_eq!(peer.log_level().await, LoggingLevel::Debug);
        peer.set_log_level(LoggingLevel::Warning).await;
        assert_eq!(peer.log_level().await, LoggingLevel::Warning);
    }

    #[tokio::test]
    async fn test_abandoned_request_frees_slot() {
        let (tx, mut rx) = mpsc::channel(10);
        let peer = Arc::new(Peer::new(tx));

        let waiter = {
            let peer = peer.clone();
            tokio::spawn(async move { peer.request("elicitation/create", None).await })
        };
        let _ = rx.recv().await;
        assert_eq!(peer.pending_count(), 1);

        waiter.abort();
        let _ = waiter.await;
        assert_eq!(peer.pending_count(), 0);
    }

    #[test]
    fn test_unknown_response_is_ignored() {
        let peer = Peer::detached();
        peer.resolve(JsonRpcResponse::success(RequestId::Number(99), json!({})));
        assert_eq!(peer.pending_count(), 0);
    }
}
