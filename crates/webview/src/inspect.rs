//! Element inspection
//!
//! Hit-test a canvas point, then either fetch the element's box model for the
//! overlay or dig the element's source location out of the runtime object graph.
//! Every step is best effort: a failed call ends that one inspection quietly.

use protocol::{methods, BoxModel, SourceLocation};
use serde_json::{json, Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::connection::Connection;
use crate::error::Result;

/// How deep the property walk follows object references
pub const MAX_PROPERTY_DEPTH: usize = 3;
pub const MAX_DEPTH_MARKER: &str = "<max depth reached>";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Page coordinates for a point given in document (client) coordinates
pub fn page_point(
    client_x: f64,
    client_y: f64,
    canvas_top: f64,
    screen_zoom: f64,
    scroll_x: f64,
    scroll_y: f64,
) -> (i64, i64) {
    let zoom = if screen_zoom > 0.0 { screen_zoom } else { 1.0 };
    (
        (client_x / zoom + scroll_x).round() as i64,
        ((client_y - canvas_top) / zoom + scroll_y).round() as i64,
    )
}

pub struct Inspector {
    conn: Arc<Connection>,
}

impl Inspector {
    pub fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    /// Backend node id of the element at `(x, y)`
    pub async fn node_at(&self, x: i64, y: i64) -> Result<Option<i64>> {
        let hit = self
            .conn
            .send(methods::DOM_GET_NODE_FOR_LOCATION, Some(json!({ "x": x, "y": y })))
            .await?;
        Ok(hit["backendNodeId"].as_i64())
    }

    pub async fn box_model_at(&self, x: i64, y: i64) -> Result<Option<BoxModel>> {
        let Some(node) = self.node_at(x, y).await? else {
            return Ok(None);
        };
        let reply = self
            .conn
            .send(methods::DOM_GET_BOX_MODEL, Some(json!({ "backendNodeId": node })))
            .await?;
        Ok(Some(serde_json::from_value(reply["model"].clone())?))
    }

    /// Source location recorded for the element at `(x, y)`, if any framework
    /// left one on it
    pub async fn source_location_at(&self, x: i64, y: i64) -> Result<Option<SourceLocation>> {
        let Some(node) = self.node_at(x, y).await? else {
            return Ok(None);
        };
        let resolved = self
            .conn
            .send(methods::DOM_RESOLVE_NODE, Some(json!({ "backendNodeId": node })))
            .await?;
        let Some(object_id) = resolved["object"]["objectId"].as_str() else {
            return Ok(None);
        };

        let properties = self.resolve_properties(object_id.to_string(), 0).await?;
        Ok(find_source_location(&properties))
    }

    /// Own properties of `object_id` as a JSON tree, following object references
    /// up to `MAX_PROPERTY_DEPTH` levels
    fn resolve_properties(&self, object_id: String, depth: usize) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let reply = self
                .conn
                .send(
                    methods::RUNTIME_GET_PROPERTIES,
                    Some(json!({ "objectId": object_id, "ownProperties": true })),
                )
                .await?;

            let mut resolved = Map::new();
            let Some(properties) = reply["result"].as_array() else {
                return Ok(Value::Object(resolved));
            };

            for property in properties {
                let Some(name) = property["name"].as_str() else {
                    continue;
                };
                let remote = &property["value"];
                let value = match remote["type"].as_str() {
                    Some("object") => match remote["objectId"].as_str() {
                        Some(_) if depth >= MAX_PROPERTY_DEPTH => json!(MAX_DEPTH_MARKER),
                        Some(child) => self.resolve_properties(child.to_string(), depth + 1).await?,
                        None => remote.get("value").cloned().unwrap_or(Value::Null),
                    },
                    Some("function") => json!("function"),
                    Some("string") | Some("number") | Some("boolean") => {
                        remote.get("value").cloned().unwrap_or(Value::Null)
                    }
                    _ => Value::Null,
                };
                resolved.insert(name.to_string(), value);
            }
            Ok(Value::Object(resolved))
        })
    }
}

/// First object in the tree with a file name and a line number, breadth first
pub fn find_source_location(tree: &Value) -> Option<SourceLocation> {
    let mut queue = std::collections::VecDeque::from([tree]);
    while let Some(node) = queue.pop_front() {
        let Some(object) = node.as_object() else {
            continue;
        };
        if let (Some(file), Some(line)) = (object.get("fileName"), object.get("lineNumber")) {
            if let (Some(file_name), Some(line_number)) = (file.as_str(), line.as_u64()) {
                return Some(SourceLocation {
                    file_name: file_name.to_string(),
                    line_number: line_number as u32,
                    column_number: object
                        .get("columnNumber")
                        .and_then(Value::as_u64)
                        .map(|c| c as u32),
                });
            }
        }
        queue.extend(object.values());
    }
    None
}
