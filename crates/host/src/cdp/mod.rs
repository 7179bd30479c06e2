//! CDP (Chrome DevTools Protocol) client
//!
//! One browser-level WebSocket; every preview tab is a flattened session on it.

pub mod client;
pub mod protocol;
pub mod session;

pub use client::{CDPClient, CDPError, EventCallback};
pub use protocol::{CDPEvent, CDPRequest, CDPResponse};
pub use session::CDPSession;
