//! Browser Preview wire protocol
//!
//! Types shared by the host half (which owns the browser) and the webview half
//! (which renders the screencast). Nothing in here touches a socket or a runtime.
//!
//! ```text
//! webview ──RequestEnvelope──► host ──CDP──► browser
//!         ◄──HostMessage─────       ◄──────
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod methods;
pub mod state;
pub mod types;

pub use config::{normalize_url, PreviewConfig};
pub use envelope::{CallbackId, EventEnvelope, HostMessage, ReplyEnvelope, RequestEnvelope};
pub use error::{ProtocolError, Result};
pub use state::{NavigationHistory, ViewState, ViewportMetadata, WindowId, WindowState};
pub use types::*;
