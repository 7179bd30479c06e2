//! Browser Preview - webview half
//!
//! Runs inside the editor panel. Talks to the host over a message transport,
//! renders the screencast and turns DOM input into CDP input.
//!
//! ## Core Design
//!
//! ```text
//! host message → Connection ─┬─ reply → pending Call settles
//!                            └─ event → Viewer → Screencast → compose → Surface
//!                                               ↑
//!                              mouse / key ─────┘ → Input.dispatch*
//! ```
//!
//! - **Ack first**: a frame is acknowledged before it is decoded
//! - **Display lists**: painting produces `DrawOp`s, the canvas only replays them
//! - **Page pixels at the edge**: canvas coordinates are divided by the screen
//!   zoom exactly once, when input leaves for the host

pub mod arena;
pub mod canvas;
pub mod connection;
pub mod decode;
pub mod emulation;
pub mod error;
pub mod highlight;
pub mod input;
pub mod inspect;
pub mod screencast;
pub mod viewer;

pub use arena::PendingCalls;
pub use canvas::{CanvasSize, DrawOp, Fill, Rgba, Surface};
pub use connection::{Call, Connection, Outbound};
pub use decode::{Base64Decoder, DecodedFrame, FrameDecoder};
pub use emulation::EmulatedViewport;
pub use error::{CallError, Result, ViewError};
pub use input::{KeyInput, KeyKind, Modifiers, MouseInput, MouseKind};
pub use inspect::Inspector;
pub use screencast::{ScreenGeometry, Screencast};
pub use viewer::{Viewer, ViewerOptions};
