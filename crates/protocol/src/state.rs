//! Per-window view state
//!
//! The same reducer runs on both halves: the webview keeps it for rendering, the
//! host keeps a copy so collaborators can be told what a window looks like.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::methods;
use crate::types::{BoxModel, ImageFormat, ScreencastFrameMetadata};

/// Window identity, immutable for the window's lifetime
pub type WindowId = Uuid;

pub const BLANK_URL: &str = "about:blank";

/// Loading bar position once the main frame has navigated
pub const NAVIGATION_STARTED_PERCENT: f64 = 0.1;

/// How long a finished load stays at 100% before the bar resets
pub const LOAD_SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationHistory {
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

impl NavigationHistory {
    /// Flags for position `index` in a history of `len` entries
    pub fn at(index: usize, len: usize) -> Self {
        Self {
            can_go_back: index > 0,
            can_go_forward: len > 0 && index < len - 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportMetadata {
    pub width: f64,
    pub height: f64,
    pub screen_zoom: f64,
    pub device_pixel_ratio: f64,
    pub emulated_device_id: Option<String>,
    pub scroll_offset_x: f64,
    pub scroll_offset_y: f64,
    pub is_loading: bool,
    pub loading_percent: f64,
    pub highlight_node: Option<BoxModel>,
    pub is_inspect_enabled: bool,
}

impl Default for ViewportMetadata {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            screen_zoom: 1.0,
            device_pixel_ratio: 1.0,
            emulated_device_id: None,
            scroll_offset_x: 0.0,
            scroll_offset_y: 0.0,
            is_loading: false,
            loading_percent: 0.0,
            highlight_node: None,
            is_inspect_enabled: false,
        }
    }
}

/// What the UI knows about its page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewState {
    pub url: String,
    pub history: NavigationHistory,
    pub viewport_metadata: ViewportMetadata,
    pub format: ImageFormat,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            url: BLANK_URL.to_string(),
            history: NavigationHistory::default(),
            viewport_metadata: ViewportMetadata::default(),
            format: ImageFormat::default(),
        }
    }
}

impl ViewState {
    /// Fold one CDP event into the state. Returns true if anything changed.
    ///
    /// Events this state doesn't track are ignored.
    pub fn apply_event(&mut self, method: &str, params: &Value) -> bool {
        match method {
            methods::FRAME_NAVIGATED => {
                let frame = &params["frame"];
                let is_main_frame = frame.get("parentId").map_or(true, Value::is_null);
                if !is_main_frame {
                    return false;
                }
                if let Some(url) = frame["url"].as_str() {
                    self.url = url.to_string();
                }
                self.viewport_metadata.is_loading = true;
                self.viewport_metadata.loading_percent = NAVIGATION_STARTED_PERCENT;
                true
            }
            methods::NAVIGATED_WITHIN_DOCUMENT => match params["url"].as_str() {
                Some(url) if url != self.url => {
                    self.url = url.to_string();
                    true
                }
                _ => false,
            },
            methods::LOAD_EVENT_FIRED => {
                self.viewport_metadata.loading_percent = 1.0;
                true
            }
            methods::SCREENCAST_FRAME => {
                match serde_json::from_value::<ScreencastFrameMetadata>(params["metadata"].clone())
                {
                    Ok(metadata) => self.apply_frame_metadata(&metadata),
                    Err(_) => false,
                }
            }
            _ => false,
        }
    }

    pub fn apply_frame_metadata(&mut self, metadata: &ScreencastFrameMetadata) -> bool {
        let vm = &mut self.viewport_metadata;
        let changed = vm.scroll_offset_x != metadata.scroll_offset_x
            || vm.scroll_offset_y != metadata.scroll_offset_y;
        vm.scroll_offset_x = metadata.scroll_offset_x;
        vm.scroll_offset_y = metadata.scroll_offset_y;
        changed
    }

    /// Called `LOAD_SETTLE_DELAY` after `Page.loadEventFired`
    pub fn settle_loading(&mut self) {
        self.viewport_metadata.is_loading = false;
        self.viewport_metadata.loading_percent = 0.0;
    }

    /// A window is worth announcing to peers once it shows a real page at a known size
    pub fn is_presentable(&self) -> bool {
        self.url != BLANK_URL && self.viewport_metadata.height > 0.0
    }
}

/// A window's state as collaborators see it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    pub id: WindowId,
    #[serde(flatten)]
    pub view: ViewState,
}

impl WindowState {
    pub fn new(id: WindowId) -> Self {
        Self {
            id,
            view: ViewState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_main_frame_navigation_starts_loading() {
        let mut state = ViewState::default();
        let changed = state.apply_event(
            methods::FRAME_NAVIGATED,
            &json!({ "frame": { "id": "F1", "url": "http://example.com/" } }),
        );
        assert!(changed);
        assert_eq!(state.url, "http://example.com/");
        assert!(state.viewport_metadata.is_loading);
        assert_eq!(state.viewport_metadata.loading_percent, 0.1);
    }

    #[test]
    fn test_child_frame_navigation_ignored() {
        let mut state = ViewState::default();
        let changed = state.apply_event(
            methods::FRAME_NAVIGATED,
            &json!({ "frame": { "id": "F2", "parentId": "F1", "url": "http://ads/" } }),
        );
        assert!(!changed);
        assert_eq!(state.url, BLANK_URL);
    }

    #[test]
    fn test_load_then_settle() {
        let mut state = ViewState::default();
        state.apply_event(methods::LOAD_EVENT_FIRED, &json!({ "timestamp": 1.0 }));
        assert_eq!(state.viewport_metadata.loading_percent, 1.0);
        state.settle_loading();
        assert_eq!(state.viewport_metadata.loading_percent, 0.0);
        assert!(!state.viewport_metadata.is_loading);
    }

    #[test]
    fn test_history_flags() {
        assert_eq!(
            NavigationHistory::at(0, 1),
            NavigationHistory { can_go_back: false, can_go_forward: false }
        );
        assert_eq!(
            NavigationHistory::at(1, 3),
            NavigationHistory { can_go_back: true, can_go_forward: true }
        );
        assert_eq!(NavigationHistory::at(0, 0), NavigationHistory::default());
    }

    #[test]
    fn test_window_state_flattens_view() {
        let id = Uuid::new_v4();
        let value = serde_json::to_value(WindowState::new(id)).unwrap();
        assert_eq!(value["id"], id.to_string());
        assert_eq!(value["url"], BLANK_URL);
        assert_eq!(value["viewportMetadata"]["screenZoom"], 1.0);
    }

    #[test]
    fn test_unknown_event_ignored() {
        let mut state = ViewState::default();
        assert!(!state.apply_event("Network.requestWillBeSent", &json!({})));
    }
}
