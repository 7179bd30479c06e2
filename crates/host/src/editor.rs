//! Host editor capabilities
//!
//! The relay never talks to an editor API directly. Everything it needs from the
//! surrounding editor goes through these traits, so panels, notifications and the
//! clipboard can be swapped for test doubles.

use async_trait::async_trait;
use protocol::{HostMessage, WindowId};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

pub const PANEL_TITLE: &str = "Browser Preview";

/// System clipboard as the editor exposes it
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn read_text(&self) -> Result<String>;
    async fn write_text(&self, text: &str) -> Result<()>;
}

/// The editor around the preview
#[async_trait]
pub trait HostEditor: Send + Sync {
    fn clipboard(&self) -> Arc<dyn Clipboard>;

    /// Open `path` and reveal `line` (0-based)
    async fn open_file(&self, path: &Path, line: Option<u32>, column: Option<u32>) -> Result<()>;

    fn show_info(&self, message: &str);

    fn show_error(&self, message: &str);

    /// Free-text question. `None` when dismissed.
    async fn input_box(&self, placeholder: &str, value: Option<&str>) -> Option<String>;

    /// Pick one of `items`. `None` when dismissed.
    async fn quick_pick(&self, items: &[&str]) -> Option<String>;
}

/// One webview panel: the UI end of a window's transport
pub trait Panel: Send + Sync {
    /// Deliver a reply or event to the UI
    fn post(&self, message: HostMessage);

    fn set_title(&self, title: &str);

    fn reveal(&self);

    /// Close the panel. Must tolerate being called on a closed panel.
    fn close(&self);
}

pub trait PanelFactory: Send + Sync {
    fn create(&self, id: WindowId, title: &str, column: u32) -> Arc<dyn Panel>;
}
