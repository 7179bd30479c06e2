//! Method names that cross the UI ↔ host boundary.
//!
//! `extension.*` names, `Clipboard.*` and the two history shortcuts are handled by
//! the host itself and never reach the browser. Everything else is CDP.

pub const UPDATE_TITLE: &str = "extension.updateTitle";
pub const WINDOW_OPEN_REQUESTED: &str = "extension.windowOpenRequested";
pub const OPEN_FILE: &str = "extension.openFile";
pub const WINDOW_DIALOG_REQUESTED: &str = "extension.windowDialogRequested";
pub const APP_STATE_CHANGED: &str = "extension.appStateChanged";
pub const APP_CONFIGURATION: &str = "extension.appConfiguration";
pub const VIEWPORT: &str = "extension.viewport";

pub const CLIPBOARD_READ_TEXT: &str = "Clipboard.readText";
pub const CLIPBOARD_WRITE_TEXT: &str = "Clipboard.writeText";
pub const PAGE_GO_FORWARD: &str = "Page.goForward";
pub const PAGE_GO_BACKWARD: &str = "Page.goBackward";

/// Names that are never forwarded to the browser's CDP session.
pub const RESERVED: &[&str] = &[
    UPDATE_TITLE,
    WINDOW_OPEN_REQUESTED,
    OPEN_FILE,
    WINDOW_DIALOG_REQUESTED,
    APP_STATE_CHANGED,
    APP_CONFIGURATION,
    VIEWPORT,
    CLIPBOARD_READ_TEXT,
    CLIPBOARD_WRITE_TEXT,
    PAGE_GO_FORWARD,
    PAGE_GO_BACKWARD,
];

pub fn is_reserved(method: &str) -> bool {
    RESERVED.contains(&method)
}

// CDP commands
pub const PAGE_ENABLE: &str = "Page.enable";
pub const PAGE_NAVIGATE: &str = "Page.navigate";
pub const PAGE_RELOAD: &str = "Page.reload";
pub const PAGE_GET_NAVIGATION_HISTORY: &str = "Page.getNavigationHistory";
pub const PAGE_NAVIGATE_TO_HISTORY_ENTRY: &str = "Page.navigateToHistoryEntry";
pub const PAGE_START_SCREENCAST: &str = "Page.startScreencast";
pub const PAGE_STOP_SCREENCAST: &str = "Page.stopScreencast";
pub const PAGE_SCREENCAST_FRAME_ACK: &str = "Page.screencastFrameAck";
pub const PAGE_SET_DEVICE_METRICS_OVERRIDE: &str = "Page.setDeviceMetricsOverride";
pub const PAGE_HANDLE_JAVASCRIPT_DIALOG: &str = "Page.handleJavaScriptDialog";
pub const INPUT_DISPATCH_MOUSE_EVENT: &str = "Input.dispatchMouseEvent";
pub const INPUT_DISPATCH_KEY_EVENT: &str = "Input.dispatchKeyEvent";
pub const INPUT_INSERT_TEXT: &str = "Input.insertText";
pub const DOM_GET_NODE_FOR_LOCATION: &str = "DOM.getNodeForLocation";
pub const DOM_RESOLVE_NODE: &str = "DOM.resolveNode";
pub const DOM_GET_BOX_MODEL: &str = "DOM.getBoxModel";
pub const RUNTIME_GET_PROPERTIES: &str = "Runtime.getProperties";
pub const NETWORK_SET_USER_AGENT_OVERRIDE: &str = "Network.setUserAgentOverride";

// CDP events
pub const FRAME_NAVIGATED: &str = "Page.frameNavigated";
pub const NAVIGATED_WITHIN_DOCUMENT: &str = "Page.navigatedWithinDocument";
pub const LOAD_EVENT_FIRED: &str = "Page.loadEventFired";
pub const SCREENCAST_FRAME: &str = "Page.screencastFrame";
pub const JAVASCRIPT_DIALOG_OPENING: &str = "Page.javascriptDialogOpening";
pub const WINDOW_OPEN: &str = "Page.windowOpen";
