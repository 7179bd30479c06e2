//! Browser Preview - host half
//!
//! Runs next to the editor. Launches one browser per logical session, opens a tab
//! per preview window and relays between each panel and its tab.
//!
//! # Architecture
//!
//! 1. **One connection**: every tab is a flattened CDP session on a single
//!    browser-level WebSocket
//! 2. **Explicit dispatch**: UI messages are either host commands or page
//!    commands, decided by a closed table, never by string prefix
//! 3. **Capabilities, not globals**: the editor, panels, launcher and
//!    collaboration transport are injected traits
//! 4. **Disposal drains**: closing a window cancels every call it has in flight

pub mod cdp;
pub mod collaboration;
pub mod editor;
pub mod error;
pub mod events;
pub mod launcher;
pub mod manager;
pub mod page;
pub mod registry;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use cdp::{CDPClient, CDPSession};
pub use collaboration::{CollaborationRelay, CollaborationTransport, PeerMessage, PeerRole};
pub use editor::{Clipboard, HostEditor, Panel, PanelFactory};
pub use error::{HostError, Result};
pub use events::{EventBus, RegistryEvent};
pub use launcher::{Browser, BrowserHandle, ChromeLauncher, LaunchConfig, Launcher};
pub use manager::BrowserProcessManager;
pub use page::{LocalCommand, PageChannel, PageSession};
pub use registry::WindowRegistry;
pub use window::{WindowController, WindowEvent, WindowListener, WindowPhase};
