//! Preview demo - open one window on a real browser and print what the UI would see
//!
//! cargo run -p host --example preview -- https://example.com

use async_trait::async_trait;
use host::{Clipboard, ChromeLauncher, HostEditor, Panel, PanelFactory, WindowRegistry};
use parking_lot::Mutex;
use protocol::{methods, HostMessage, PreviewConfig, RequestEnvelope, WindowId};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

struct StdoutPanel {
    id: WindowId,
}

impl Panel for StdoutPanel {
    fn post(&self, message: HostMessage) {
        match message {
            // Frames are large; print only their metadata
            HostMessage::Event(event) if event.method == methods::SCREENCAST_FRAME => {
                println!("[{}] frame {}", self.id, event.result["metadata"]);
            }
            other => println!("[{}] {}", self.id, other.to_value()),
        }
    }

    fn set_title(&self, title: &str) {
        println!("[{}] title: {}", self.id, title);
    }

    fn reveal(&self) {}

    fn close(&self) {
        println!("[{}] closed", self.id);
    }
}

struct StdoutPanels;

impl PanelFactory for StdoutPanels {
    fn create(&self, id: WindowId, title: &str, column: u32) -> Arc<dyn Panel> {
        println!("[{}] panel '{}' in column {}", id, title, column);
        Arc::new(StdoutPanel { id })
    }
}

#[derive(Default)]
struct MemoryClipboard(Mutex<String>);

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn read_text(&self) -> host::Result<String> {
        Ok(self.0.lock().clone())
    }

    async fn write_text(&self, text: &str) -> host::Result<()> {
        *self.0.lock() = text.to_string();
        Ok(())
    }
}

#[derive(Default)]
struct ConsoleEditor {
    clipboard: Arc<MemoryClipboard>,
}

#[async_trait]
impl HostEditor for ConsoleEditor {
    fn clipboard(&self) -> Arc<dyn Clipboard> {
        self.clipboard.clone()
    }

    async fn open_file(
        &self,
        path: &Path,
        line: Option<u32>,
        _column: Option<u32>,
    ) -> host::Result<()> {
        println!("open {}:{}", path.display(), line.unwrap_or(0));
        Ok(())
    }

    fn show_info(&self, message: &str) {
        println!("info: {}", message);
    }

    fn show_error(&self, message: &str) {
        eprintln!("error: {}", message);
    }

    async fn input_box(&self, _placeholder: &str, value: Option<&str>) -> Option<String> {
        value.map(str::to_string)
    }

    async fn quick_pick(&self, items: &[&str]) -> Option<String> {
        items.first().map(|item| item.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://example.com".to_string());

    let registry = WindowRegistry::new(
        PreviewConfig::default(),
        Arc::new(ChromeLauncher::new()),
        Arc::new(ConsoleEditor::default()),
        Arc::new(StdoutPanels),
    );

    let window = registry.create(Some(&url), None).await?;
    if let Some(port) = registry.debug_port() {
        println!("Browser debug port: {}", port);
    }

    // What the webview does once it has its configuration
    window
        .handle_message(
            RequestEnvelope::new(methods::PAGE_NAVIGATE, Some(json!({ "url": url })))
                .with_callback(1),
        )
        .await;
    window
        .handle_message(
            RequestEnvelope::new(
                methods::PAGE_START_SCREENCAST,
                Some(json!({ "format": "jpeg", "maxWidth": 800, "maxHeight": 600 })),
            )
            .with_callback(2),
        )
        .await;

    // Keep alive for a bit to see events
    tokio::time::sleep(tokio::time::Duration::from_secs(3)).await;

    println!("State: {}", serde_json::to_string_pretty(&window.state())?);

    registry.dispose_all().await;
    println!("Disposed");

    Ok(())
}
