//! Event Bus - window lifecycle as seen from outside the registry
//!
//! Design: one enum, one broadcast channel. Slow subscribers lag, they never
//! block a window.

use protocol::WindowId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Registry events that can be dispatched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegistryEvent {
    WindowCreated { id: WindowId },
    WindowDisposed { id: WindowId },
    WindowOpenRequested { url: String },
    WindowInteraction {
        id: WindowId,
        method: String,
        params: Option<Value>,
    },
    WindowStateChanged { id: WindowId },
}

/// Simple event bus using tokio broadcast channel
pub struct EventBus {
    tx: broadcast::Sender<RegistryEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event
    pub fn publish(&self, event: RegistryEvent) {
        let _ = self.tx.send(event); // Ignore error if no subscribers
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
