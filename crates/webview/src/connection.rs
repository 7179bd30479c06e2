//! RPC bridge to the host
//!
//! The webview side of the relay. `send` posts a request envelope and hands back a
//! future that settles when the host replies with the same `callbackId`. Messages
//! without a callback id are events and fan out to listeners by method name.

use ahash::AHashMap;
use parking_lot::Mutex;
use protocol::{HostMessage, RequestEnvelope};
use serde_json::Value;
use smallvec::SmallVec;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::arena::{CallResult, PendingCalls};
use crate::error::CallError;

/// Where envelopes go. The panel transport in production, a recorder in tests.
pub trait Outbound: Send + Sync {
    fn post(&self, envelope: RequestEnvelope);
}

/// Event listener, called with the event's `result` payload
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// A call in flight. Dropping it does not cancel the request.
#[must_use = "a Call does nothing unless awaited"]
pub struct Call {
    rx: oneshot::Receiver<CallResult>,
}

impl Future for Call {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(CallError::Disposed)))
    }
}

pub struct Connection {
    outbound: Arc<dyn Outbound>,
    pending: Mutex<PendingCalls>,
    listeners: Mutex<AHashMap<String, SmallVec<[Listener; 2]>>>,
    fallback: Mutex<Vec<Listener>>,
    verbose: AtomicBool,
    disposed: AtomicBool,
}

impl Connection {
    pub fn new(outbound: Arc<dyn Outbound>) -> Self {
        Self {
            outbound,
            pending: Mutex::new(PendingCalls::new()),
            listeners: Mutex::new(AHashMap::new()),
            fallback: Mutex::new(Vec::new()),
            verbose: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    /// Post `method` now and return a future for its reply
    pub fn send(&self, method: &str, params: Option<Value>) -> Call {
        let (tx, rx) = oneshot::channel();

        if self.is_disposed() {
            let _ = tx.send(Err(CallError::Disposed));
            return Call { rx };
        }

        let id = self.pending.lock().allocate(method, tx);
        if self.is_verbose() {
            tracing::debug!("SEND ► {} #{} {:?}", method, id, params);
        }
        self.outbound
            .post(RequestEnvelope::new(method, params).with_callback(id));
        Call { rx }
    }

    /// Post `method` without asking for a reply
    pub fn notify(&self, method: &str, params: Option<Value>) {
        if self.is_disposed() {
            return;
        }
        if self.is_verbose() {
            tracing::debug!("SEND ► {} {:?}", method, params);
        }
        self.outbound.post(RequestEnvelope::new(method, params));
    }

    /// Feed one raw message from the host
    pub fn on_message(&self, raw: Value) {
        let message = match HostMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Dropping host message: {}", e);
                return;
            }
        };

        match message {
            HostMessage::Reply(reply) => {
                // Unknown ids are late or duplicate replies
                let Some(call) = self.pending.lock().take(reply.callback_id) else {
                    tracing::trace!("No pending call #{}", reply.callback_id);
                    return;
                };
                if self.is_verbose() {
                    tracing::debug!(
                        "◀ RECV {} #{} after {:?}",
                        call.method,
                        reply.callback_id,
                        call.age()
                    );
                }
                let result = match reply.error {
                    Some(message) => Err(CallError::Remote {
                        method: call.method.clone(),
                        message,
                    }),
                    None => Ok(reply.result.unwrap_or(Value::Null)),
                };
                call.settle(result);
            }
            HostMessage::Event(event) => {
                if self.is_verbose() {
                    tracing::debug!("◀ RECV {}", event.method);
                }
                self.emit(&event.method, &event.result);
            }
        }
    }

    /// Listen for events named `method`
    pub fn on(&self, method: &str, listener: Listener) {
        self.listeners
            .lock()
            .entry(method.to_string())
            .or_default()
            .push(listener);
    }

    /// Listen for events nobody registered a method listener for
    pub fn on_unhandled(&self, listener: Listener) {
        self.fallback.lock().push(listener);
    }

    fn emit(&self, method: &str, payload: &Value) {
        // Clone out so listeners may register more listeners
        let listeners = self.listeners.lock().get(method).cloned();
        match listeners {
            Some(listeners) => {
                for listener in listeners {
                    listener(payload);
                }
            }
            None => {
                let fallback = self.fallback.lock().clone();
                for listener in fallback {
                    listener(payload);
                }
            }
        }
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Reject every pending call and stop delivering events. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let drained = self.pending.lock().drain();
        if !drained.is_empty() {
            tracing::debug!("Rejecting {} pending calls", drained.len());
        }
        for (_, call) in drained {
            call.settle(Err(CallError::Disposed));
        }
        self.listeners.lock().clear();
        self.fallback.lock().clear();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<RequestEnvelope>>);

    impl Outbound for Recorder {
        fn post(&self, envelope: RequestEnvelope) {
            self.0.lock().push(envelope);
        }
    }

    fn connection() -> (Connection, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (Connection::new(recorder.clone()), recorder)
    }

    #[tokio::test]
    async fn test_callback_ids_strictly_increase() {
        let (conn, out) = connection();
        let _calls: Vec<Call> = (0..5).map(|_| conn.send("Page.reload", None)).collect();

        let ids: Vec<_> = out.0.lock().iter().map(|e| e.callback_id.unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(conn.pending_len(), 5);
    }

    #[tokio::test]
    async fn test_reply_settles_once() {
        let (conn, _out) = connection();
        let call = conn.send("Page.getNavigationHistory", None);

        conn.on_message(json!({ "callbackId": 1, "result": { "currentIndex": 0 } }));
        // Second reply for the same id is ignored
        conn.on_message(json!({ "callbackId": 1, "result": { "currentIndex": 9 } }));

        assert_eq!(call.await.unwrap()["currentIndex"], 0);
        assert_eq!(conn.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_error_reply_names_the_method() {
        let (conn, _out) = connection();
        let call = conn.send("Page.navigate", Some(json!({ "url": "nope" })));
        conn.on_message(json!({ "callbackId": 1, "error": "Cannot navigate to invalid URL" }));

        assert_eq!(
            call.await,
            Err(CallError::Remote {
                method: "Page.navigate".to_string(),
                message: "Cannot navigate to invalid URL".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_unmatched_reply_is_ignored() {
        let (conn, _out) = connection();
        conn.on_message(json!({ "callbackId": 42, "result": {} }));
        assert_eq!(conn.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_dispose_drains_pending_calls() {
        let (conn, out) = connection();
        let calls: Vec<Call> = (0..3).map(|_| conn.send("Page.enable", None)).collect();

        conn.dispose();
        assert_eq!(conn.pending_len(), 0);
        for call in calls {
            assert_eq!(call.await, Err(CallError::Disposed));
        }

        // Nothing is posted once disposed
        assert_eq!(conn.send("Page.enable", None).await, Err(CallError::Disposed));
        assert_eq!(out.0.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_events_fan_out_by_method() {
        let (conn, _out) = connection();
        let loads = Arc::new(AtomicUsize::new(0));
        let unhandled = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let loads = loads.clone();
            conn.on(
                "Page.loadEventFired",
                Arc::new(move |_| {
                    loads.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        let seen = unhandled.clone();
        conn.on_unhandled(Arc::new(move |payload| seen.lock().push(payload.clone())));

        conn.on_message(json!({ "method": "Page.loadEventFired", "result": {} }));
        conn.on_message(json!({ "method": "Page.domContentEventFired", "result": { "t": 1 } }));

        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(*unhandled.lock(), vec![json!({ "t": 1 })]);
    }

    #[tokio::test]
    async fn test_verbose_toggle_keeps_calls() {
        let (conn, _out) = connection();
        let call = conn.send("Page.reload", None);
        conn.set_verbose(true);
        assert!(conn.is_verbose());
        conn.on_message(json!({ "callbackId": 1, "result": null }));
        assert_eq!(call.await, Ok(Value::Null));
    }
}
