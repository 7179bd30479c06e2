//! CDP Client - The Core Communication Layer
//!
//! Design decisions:
//! 1. Single WebSocket per browser connection (tabs are flattened sessions)
//! 2. Async message passing - no locks on the receive path
//! 3. Request/response matching via ID, events routed by session then by method
//! 4. Fail fast - no retries, no queuing. Let the caller decide.

use dashmap::DashMap;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::protocol::*;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

#[derive(Error, Debug)]
pub enum CDPError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CDP protocol error: {code} - {message}")]
    Protocol { code: i32, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Connection closed")]
    Closed,

    #[error("Session disposed")]
    Disposed,
}

/// Result type for CDP operations
pub type Result<T> = std::result::Result<T, CDPError>;

/// Event subscriber callback
pub type EventCallback = Arc<dyn Fn(CDPEvent) + Send + Sync>;

struct PendingRequest {
    session_id: Option<SessionId>,
    tx: oneshot::Sender<CDPResponse>,
}

/// CDP Client - manages single WebSocket connection to browser
pub struct CDPClient {
    /// Monotonic request ID counter
    next_id: AtomicU64,

    /// Pending requests waiting for responses
    pending: Arc<DashMap<RequestId, PendingRequest>>,

    /// Browser-level event subscribers, keyed by method name
    subscribers: Arc<DashMap<String, Vec<EventCallback>>>,

    /// Per-session subscribers; they see every event of their session
    session_subscribers: Arc<DashMap<SessionId, Vec<EventCallback>>>,

    /// WebSocket write half
    ws_sink: Arc<Mutex<WsSink>>,

    /// Stops the receive loop
    shutdown_tx: mpsc::Sender<()>,
}

impl CDPClient {
    /// Connect to Chrome DevTools Protocol endpoint
    pub async fn connect(ws_url: &str) -> Result<Arc<Self>> {
        let (ws_stream, _) = connect_async(ws_url).await?;
        let (sink, mut stream) = ws_stream.split();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let client = Arc::new(Self {
            next_id: AtomicU64::new(1),
            pending: Arc::new(DashMap::new()),
            subscribers: Arc::new(DashMap::new()),
            session_subscribers: Arc::new(DashMap::new()),
            ws_sink: Arc::new(Mutex::new(sink)),
            shutdown_tx,
        });

        let client_clone = client.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                if let Err(e) = client_clone.handle_message(&text) {
                                    tracing::error!("Failed to handle message: {}", e);
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::info!("WebSocket closed");
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::error!("WebSocket error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Shutdown signal received");
                        break;
                    }
                }
            }

            // Dropping the senders fails every waiter with Closed
            client_clone.pending.clear();
        });

        Ok(client)
    }

    /// Send CDP request and wait for response
    pub async fn send_request(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
        session_id: Option<SessionId>,
    ) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CDPRequest {
            id,
            method: method.into(),
            params,
            session_id: session_id.clone(),
        };

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, PendingRequest { session_id, tx });

        let json = serde_json::to_string(&request)?;
        {
            let mut sink = self.ws_sink.lock().await;
            if let Err(e) = sink.send(Message::Text(json)).await {
                self.pending.remove(&id);
                return Err(CDPError::WebSocket(e));
            }
        }

        let response = rx.await.map_err(|_| CDPError::Closed)?;

        if let Some(error) = response.error {
            return Err(CDPError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Subscribe to browser-level CDP events by method
    pub fn subscribe(&self, method: impl Into<String>, callback: EventCallback) {
        self.subscribers
            .entry(method.into())
            .or_default()
            .push(callback);
    }

    /// Subscribe to every event of one attached session
    pub fn subscribe_session(&self, session_id: impl Into<SessionId>, callback: EventCallback) {
        self.session_subscribers
            .entry(session_id.into())
            .or_default()
            .push(callback);
    }

    /// Forget a session: its subscribers are removed and its in-flight
    /// requests fail with `Closed`.
    pub fn drain_session(&self, session_id: &str) {
        self.session_subscribers.remove(session_id);
        self.pending
            .retain(|_, pending| pending.session_id.as_deref() != Some(session_id));
    }

    /// Number of requests still waiting for a response
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Handle incoming WebSocket message
    fn handle_message(&self, text: &str) -> Result<()> {
        let msg: CDPMessage = serde_json::from_str(text)?;

        match msg {
            CDPMessage::Response(response) => {
                if let Some((_, pending)) = self.pending.remove(&response.id) {
                    let _ = pending.tx.send(response); // Receiver may be gone
                } else {
                    tracing::warn!("Received response for unknown request: {}", response.id);
                }
            }
            CDPMessage::Event(event) => self.dispatch_event(event),
        }

        Ok(())
    }

    fn dispatch_event(&self, event: CDPEvent) {
        if let Some(session_id) = event.session_id.as_deref() {
            // Clone out of the map so a callback may subscribe without deadlocking
            let callbacks = self
                .session_subscribers
                .get(session_id)
                .map(|entry| entry.value().clone());
            if let Some(callbacks) = callbacks {
                for callback in callbacks {
                    callback(event.clone());
                }
                return;
            }
        }

        let callbacks = self
            .subscribers
            .get(&event.method)
            .map(|entry| entry.value().clone());
        if let Some(callbacks) = callbacks {
            for callback in callbacks {
                callback(event.clone());
            }
        }
    }

    /// Close connection gracefully
    pub async fn close(&self) -> Result<()> {
        let _ = self.shutdown_tx.try_send(());
        let mut sink = self.ws_sink.lock().await;
        sink.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Real tests need a running Chrome instance

    #[tokio::test]
    #[ignore]
    async fn test_connect() {
        let client = CDPClient::connect("ws://localhost:9222/devtools/browser")
            .await
            .unwrap();

        let result = client
            .send_request("Browser.getVersion", None, None)
            .await
            .unwrap();

        println!("Browser version: {:?}", result);
    }
}
