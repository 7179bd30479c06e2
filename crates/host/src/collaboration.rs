//! Collaboration relay
//!
//! Mirrors windows between the peers of a shared editing session. The host
//! owns the real browsers and announces them; guests recreate each announced
//! window locally under the same id. Input on either side is replayed on the
//! other.
//!
//! The transport is optional. Without one the relay never starts.

use async_trait::async_trait;
use parking_lot::Mutex;
use protocol::{ViewportMetadata, WindowId, WindowState};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::events::RegistryEvent;
use crate::registry::WindowRegistry;

pub const REQUEST_GET_WINDOWS: &str = "getWindows";
pub const NOTIFICATION_WINDOW_CREATED: &str = "windowCreated";
pub const NOTIFICATION_WINDOW_DISPOSED: &str = "windowDisposed";
pub const NOTIFICATION_WINDOW_INTERACTION: &str = "windowInteraction";
pub const NOTIFICATION_WINDOW_RESIZED: &str = "windowResized";

/// Interactions worth replaying on the other side
pub const DISPATCHED_EVENTS: &[&str] = &[
    "Input.dispatchKeyEvent",
    "Input.dispatchMouseEvent",
    "Page.goBackward",
    "Page.goForward",
    "Page.navigate",
    "Page.reload",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    Host,
    Guest,
}

#[derive(Debug)]
pub enum PeerMessage {
    Request {
        name: String,
        args: Value,
        reply: oneshot::Sender<Value>,
    },
    Notification {
        name: String,
        args: Value,
    },
}

/// A shared-session service channel
#[async_trait]
pub trait CollaborationTransport: Send + Sync {
    fn role(&self) -> PeerRole;

    /// This peer's number within the session
    fn peer_number(&self) -> u32;

    async fn request(&self, name: &str, args: Value) -> Result<Value>;

    fn notify(&self, name: &str, args: Value);

    /// Everything the other peers send. Only the first call gets the receiver.
    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<PeerMessage>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WindowIdNotice {
    id: WindowId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WindowResizedNotice {
    id: WindowId,
    viewport_metadata: ViewportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InteractionData {
    #[serde(rename = "type")]
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WindowInteractionNotice {
    peer_number: u32,
    id: WindowId,
    data: InteractionData,
}

struct Relay {
    registry: WindowRegistry,
    transport: Arc<dyn CollaborationTransport>,
    /// Host: windows created but not yet presentable
    awaiting: Mutex<HashSet<WindowId>>,
    /// Host: last announced size per window
    sizes: Mutex<HashMap<WindowId, (f64, f64)>>,
}

pub struct CollaborationRelay {
    tasks: Vec<JoinHandle<()>>,
}

impl CollaborationRelay {
    /// Start relaying. `None` when there is no transport to relay over.
    pub async fn start(
        registry: WindowRegistry,
        transport: Option<Arc<dyn CollaborationTransport>>,
    ) -> Option<Self> {
        let Some(transport) = transport else {
            tracing::info!("No collaboration transport, relay disabled");
            return None;
        };
        let Some(mut incoming) = transport.take_incoming() else {
            tracing::warn!("Collaboration transport already in use");
            return None;
        };

        let role = transport.role();
        tracing::info!(?role, peer = transport.peer_number(), "Starting collaboration relay");

        let relay = Arc::new(Relay {
            registry,
            transport,
            awaiting: Mutex::new(HashSet::new()),
            sizes: Mutex::new(HashMap::new()),
        });

        let mut local = relay.registry.subscribe();

        match role {
            PeerRole::Host => relay.track_existing_windows(),
            PeerRole::Guest => relay.mirror_remote_windows().await,
        }

        let remote_relay = relay.clone();
        let remote = tokio::spawn(async move {
            while let Some(message) = incoming.recv().await {
                remote_relay.on_peer_message(message).await;
            }
            tracing::debug!("Collaboration transport closed");
        });

        let local_relay = relay;
        let local = tokio::spawn(async move {
            loop {
                match local.recv().await {
                    Ok(event) => local_relay.on_local_event(event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Collaboration relay lagged behind window events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Some(Self {
            tasks: vec![remote, local],
        })
    }

    pub fn stop(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for CollaborationRelay {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Relay {
    fn role(&self) -> PeerRole {
        self.transport.role()
    }

    fn track_existing_windows(&self) {
        let mut sizes = self.sizes.lock();
        for state in self.registry.states() {
            let vm = &state.view.viewport_metadata;
            sizes.insert(state.id, (vm.width, vm.height));
        }
    }

    async fn mirror_remote_windows(&self) {
        let windows = match self.transport.request(REQUEST_GET_WINDOWS, json!([])).await {
            Ok(windows) => windows,
            Err(e) => {
                tracing::warn!("getWindows failed: {}", e);
                return;
            }
        };

        match serde_json::from_value::<Vec<WindowState>>(windows) {
            Ok(states) => {
                tracing::debug!(count = states.len(), "Mirroring host windows");
                for state in states {
                    self.mirror_window(state).await;
                }
            }
            Err(e) => tracing::warn!("Unexpected getWindows reply: {}", e),
        }
    }

    async fn mirror_window(&self, state: WindowState) {
        if self.registry.get_by_id(state.id).is_some() {
            return;
        }
        match self.registry.create(Some(&state.view.url), Some(state.id)).await {
            Ok(window) => window.set_viewport(state.view.viewport_metadata),
            Err(e) => tracing::warn!(window = %state.id, "Failed to mirror window: {}", e),
        }
    }

    fn on_local_event(&self, event: RegistryEvent) {
        match event {
            RegistryEvent::WindowCreated { id } if self.role() == PeerRole::Host => {
                self.awaiting.lock().insert(id);
                self.announce_if_ready(id);
            }
            RegistryEvent::WindowStateChanged { id } if self.role() == PeerRole::Host => {
                if !self.announce_if_ready(id) {
                    self.notify_if_resized(id);
                }
            }
            RegistryEvent::WindowDisposed { id } if self.role() == PeerRole::Host => {
                self.awaiting.lock().remove(&id);
                self.sizes.lock().remove(&id);
                tracing::debug!(window = %id, "Notifying guests of window disposal");
                self.send(NOTIFICATION_WINDOW_DISPOSED, &WindowIdNotice { id });
            }
            RegistryEvent::WindowInteraction { id, method, params } => {
                if !DISPATCHED_EVENTS.contains(&method.as_str()) {
                    return;
                }
                let notice = WindowInteractionNotice {
                    peer_number: self.transport.peer_number(),
                    id,
                    data: InteractionData { method, params },
                };
                self.send(NOTIFICATION_WINDOW_INTERACTION, &notice);
            }
            _ => {}
        }
    }

    /// Announce a window the first time its state is presentable
    fn announce_if_ready(&self, id: WindowId) -> bool {
        if !self.awaiting.lock().contains(&id) {
            return false;
        }
        let Some(window) = self.registry.get_by_id(id) else {
            return false;
        };
        let state = window.state();
        if !state.view.is_presentable() {
            return false;
        }

        self.awaiting.lock().remove(&id);
        let vm = &state.view.viewport_metadata;
        self.sizes.lock().insert(id, (vm.width, vm.height));

        tracing::debug!(window = %id, url = %state.view.url, "Notifying guests of window");
        self.send(NOTIFICATION_WINDOW_CREATED, &state);
        true
    }

    fn notify_if_resized(&self, id: WindowId) {
        let Some(window) = self.registry.get_by_id(id) else {
            return;
        };
        let viewport_metadata = window.state().view.viewport_metadata;
        let size = (viewport_metadata.width, viewport_metadata.height);

        {
            let mut sizes = self.sizes.lock();
            match sizes.get(&id) {
                Some(previous) if *previous != size => {
                    sizes.insert(id, size);
                }
                _ => return,
            }
        }

        tracing::debug!(window = %id, "Notifying guests of window resize");
        self.send(
            NOTIFICATION_WINDOW_RESIZED,
            &WindowResizedNotice {
                id,
                viewport_metadata,
            },
        );
    }

    fn send<T: Serialize>(&self, name: &str, args: &T) {
        match serde_json::to_value(args) {
            Ok(args) => self.transport.notify(name, args),
            Err(e) => tracing::warn!(name, "Unserialisable notification: {}", e),
        }
    }

    async fn on_peer_message(&self, message: PeerMessage) {
        match message {
            PeerMessage::Request { name, reply, .. } => {
                let answer = if name == REQUEST_GET_WINDOWS && self.role() == PeerRole::Host {
                    serde_json::to_value(self.registry.states()).unwrap_or(Value::Null)
                } else {
                    tracing::debug!(name = %name, "Unhandled collaboration request");
                    Value::Null
                };
                let _ = reply.send(answer);
            }
            PeerMessage::Notification { name, args } => self.on_notification(&name, args).await,
        }
    }

    async fn on_notification(&self, name: &str, args: Value) {
        match (name, self.role()) {
            (NOTIFICATION_WINDOW_INTERACTION, _) => self.on_remote_interaction(args).await,
            (NOTIFICATION_WINDOW_CREATED, PeerRole::Guest) => {
                match serde_json::from_value::<WindowState>(args) {
                    Ok(state) => self.mirror_window(state).await,
                    Err(e) => tracing::warn!("Bad windowCreated notice: {}", e),
                }
            }
            (NOTIFICATION_WINDOW_DISPOSED, PeerRole::Guest) => {
                if let Ok(WindowIdNotice { id }) = serde_json::from_value(args) {
                    if let Some(window) = self.registry.get_by_id(id) {
                        window.dispose().await;
                    }
                }
            }
            (NOTIFICATION_WINDOW_RESIZED, PeerRole::Guest) => {
                if let Ok(notice) = serde_json::from_value::<WindowResizedNotice>(args) {
                    if let Some(window) = self.registry.get_by_id(notice.id) {
                        window.set_viewport(notice.viewport_metadata);
                    }
                }
            }
            _ => tracing::debug!(name, "Ignoring collaboration notification"),
        }
    }

    async fn on_remote_interaction(&self, args: Value) {
        let notice: WindowInteractionNotice = match serde_json::from_value(args.clone()) {
            Ok(notice) => notice,
            Err(e) => {
                tracing::warn!("Bad windowInteraction notice: {}", e);
                return;
            }
        };

        // Our own interaction, re-broadcast by the host
        if notice.peer_number == self.transport.peer_number() {
            return;
        }

        if let Some(window) = self.registry.get_by_id(notice.id) {
            tracing::debug!(
                window = %notice.id,
                method = %notice.data.method,
                "Replaying remote interaction"
            );
            window.replay(&notice.data.method, notice.data.params).await;
        }

        if self.role() == PeerRole::Host {
            self.transport.notify(NOTIFICATION_WINDOW_INTERACTION, args);
        }
    }
}
