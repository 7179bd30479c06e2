//! Canvas input to `Input.dispatch*` params
//!
//! Canvas coordinates are divided by the screen zoom to land in page pixels.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Modifier keys held during an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    /// CDP bitmask: alt=1, ctrl=2, meta=4, shift=8
    pub fn bits(&self) -> u32 {
        u32::from(self.alt)
            | u32::from(self.ctrl) << 1
            | u32::from(self.meta) << 2
            | u32::from(self.shift) << 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseKind {
    #[serde(rename = "mousedown")]
    Down,
    #[serde(rename = "mouseup")]
    Up,
    #[serde(rename = "mousemove")]
    Move,
    Wheel,
    Click,
}

impl MouseKind {
    /// CDP event type. Clicks only matter to inspection and have none.
    pub fn cdp_type(&self) -> Option<&'static str> {
        match self {
            MouseKind::Down => Some("mousePressed"),
            MouseKind::Up => Some("mouseReleased"),
            MouseKind::Move => Some("mouseMoved"),
            MouseKind::Wheel => Some("mouseWheel"),
            MouseKind::Click => None,
        }
    }
}

/// A mouse event on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseInput {
    #[serde(rename = "type")]
    pub kind: MouseKind,
    /// Position relative to the canvas
    pub offset_x: f64,
    pub offset_y: f64,
    /// Position relative to the document
    #[serde(default)]
    pub client_x: f64,
    #[serde(default)]
    pub client_y: f64,
    /// 0 none, 1 left, 2 middle, 3 right
    #[serde(default)]
    pub which: u8,
    #[serde(default)]
    pub delta_x: f64,
    #[serde(default)]
    pub delta_y: f64,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl MouseInput {
    pub fn at(kind: MouseKind, x: f64, y: f64) -> Self {
        Self {
            kind,
            offset_x: x,
            offset_y: y,
            client_x: x,
            client_y: y,
            which: 0,
            delta_x: 0.0,
            delta_y: 0.0,
            modifiers: Modifiers::default(),
        }
    }
}

fn button_name(which: u8) -> &'static str {
    match which {
        1 => "left",
        2 => "middle",
        3 => "right",
        _ => "none",
    }
}

/// `Input.dispatchMouseEvent` params, `None` for events the page never sees
pub fn mouse_event_params(input: &MouseInput, screen_zoom: f64) -> Option<Value> {
    let kind = input.kind.cdp_type()?;
    let zoom = if screen_zoom > 0.0 { screen_zoom } else { 1.0 };

    let click_count = match input.kind {
        MouseKind::Down | MouseKind::Up => 1,
        _ => 0,
    };
    let (delta_x, delta_y) = match input.kind {
        MouseKind::Wheel => (input.delta_x / zoom, input.delta_y / zoom),
        _ => (0.0, 0.0),
    };

    Some(json!({
        "type": kind,
        "x": input.offset_x / zoom,
        "y": input.offset_y / zoom,
        "modifiers": input.modifiers.bits(),
        "button": button_name(input.which),
        "clickCount": click_count,
        "deltaX": delta_x,
        "deltaY": delta_y,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    #[serde(rename = "keydown")]
    Down,
    #[serde(rename = "keyup")]
    Up,
    #[serde(rename = "keypress")]
    Press,
}

/// A keyboard event on the focused canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInput {
    #[serde(rename = "type")]
    pub kind: KeyKind,
    pub key: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub key_code: u32,
    /// Character produced by a keypress
    #[serde(default)]
    pub char_code: Option<u32>,
    #[serde(default)]
    pub modifiers: Modifiers,
}

/// `Input.dispatchKeyEvent` params. Only `char` events carry text.
pub fn key_event_params(input: &KeyInput) -> Value {
    let kind = match input.kind {
        KeyKind::Down => "keyDown",
        KeyKind::Up => "keyUp",
        KeyKind::Press => "char",
    };

    let mut params = json!({
        "type": kind,
        "modifiers": input.modifiers.bits(),
        "code": input.code,
        "key": input.key,
        "windowsVirtualKeyCode": input.key_code,
        "nativeVirtualKeyCode": input.key_code,
        "autoRepeat": false,
        "isKeypad": false,
        "isSystemKey": false,
    });

    if input.kind == KeyKind::Press {
        let text = input
            .char_code
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| input.key.clone());
        params["unmodifiedText"] = json!(text.to_lowercase());
        params["text"] = json!(text);
    }
    params
}
